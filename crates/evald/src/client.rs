//! Minimal blocking client for the daemon socket.
//!
//! Opens one connection per evaluation, mirroring the daemon's one-shot
//! exchange. Intended for tools and tests that sit next to the daemon.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::protocol::{self, ProtocolError, Request};

/// Slack added to the evaluation timeout before socket I/O gives up.
const IO_GRACE: Duration = Duration::from_secs(5);

/// Errors reported by [`EvalClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure socket timeouts: {source}")]
    Timeout {
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("daemon closed the connection without a response")]
    NoResponse,
}

/// Client bound to a daemon socket path.
#[derive(Debug, Clone)]
pub struct EvalClient {
    path: PathBuf,
}

impl EvalClient {
    /// Creates a client for the socket at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Socket path this client connects to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Evaluates `code` in the session named `session_key`.
    ///
    /// A positive `timeout_millis` is forwarded to the daemon and also bounds
    /// socket reads and writes, with five seconds of slack.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the daemon is unreachable, the exchange
    /// fails, or the daemon closes the connection without answering.
    pub fn evaluate(
        &self,
        session_key: &str,
        code: &str,
        timeout_millis: i32,
    ) -> Result<String, ClientError> {
        let mut stream = UnixStream::connect(&self.path).map_err(|source| ClientError::Connect {
            path: self.path.display().to_string(),
            source,
        })?;

        let io_timeout = io_timeout(timeout_millis);
        stream
            .set_read_timeout(io_timeout)
            .and_then(|()| stream.set_write_timeout(io_timeout))
            .map_err(|source| ClientError::Timeout { source })?;

        let request = Request::new(session_key, code).with_timeout_millis(timeout_millis);
        protocol::write_request(&mut stream, &request)?;
        protocol::read_response(&mut stream)?.ok_or(ClientError::NoResponse)
    }
}

fn io_timeout(timeout_millis: i32) -> Option<Duration> {
    u64::try_from(timeout_millis)
        .ok()
        .filter(|millis| *millis > 0)
        .map(|millis| Duration::from_millis(millis) + IO_GRACE)
}
