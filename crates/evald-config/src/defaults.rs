use crate::socket::SocketEndpoint;

/// Descriptor the launcher hands over with an already-listening socket.
pub const DEFAULT_LISTEN_FD: i32 = 3;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the default socket endpoint for the daemon.
///
/// The daemon is normally started by a supervisor that has already bound and
/// listened on the socket, passing it down as descriptor 3.
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::inherited(DEFAULT_LISTEN_FD)
}
