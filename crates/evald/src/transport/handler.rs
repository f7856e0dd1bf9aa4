//! Connection handling abstraction for the daemon listener.

use std::os::unix::net::UnixStream;

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking;
    /// the stream is closed when it is dropped.
    fn handle(&self, stream: UnixStream);
}
