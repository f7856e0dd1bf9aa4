//! Error types for wire framing.

use std::io;

use thiserror::Error;

/// Errors surfaced while reading or writing protocol frames.
///
/// A short read is not an error: decoders report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reading from the peer failed.
    #[error("failed to read frame: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
    /// Writing to the peer failed.
    #[error("failed to write frame: {source}")]
    Write {
        #[source]
        source: io::Error,
    },
    /// A length field in the request header was negative.
    #[error("negative {field} length {value} in request header")]
    NegativeLength { field: &'static str, value: i32 },
    /// The request body exceeds what the daemon is willing to buffer.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },
    /// The response body exceeds what the frame can describe or the reader accepts.
    #[error("response too large: {size} bytes exceeds {max_size} byte limit")]
    ResponseTooLarge { size: usize, max_size: usize },
}

impl ProtocolError {
    pub(crate) fn read(source: io::Error) -> Self {
        Self::Read { source }
    }

    pub(crate) fn write(source: io::Error) -> Self {
        Self::Write { source }
    }
}
