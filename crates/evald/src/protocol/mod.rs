//! Binary framing for evaluation requests and responses.
//!
//! Every connection carries exactly one exchange. The client sends a 12-byte
//! header of three little-endian `i32` values (`timeout_millis`, key length,
//! code length) followed by the UTF-8 session key and code. The daemon answers
//! with a little-endian `i32` length and that many bytes of UTF-8 text:
//!
//! ```text
//! request:  [timeout:i32][key_len:i32][code_len:i32][key][code]
//! response: [text_len:i32][text]
//! ```
//!
//! There is no version byte, checksum or keep-alive.

mod codec;
mod errors;

pub use self::codec::{
    HEADER_LEN, MAX_REQUEST_BYTES, MAX_RESPONSE_BYTES, read_request, read_response,
    write_request, write_response,
};
pub use self::errors::ProtocolError;

/// A decoded evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Advisory execution budget supplied by the client. Not enforced.
    pub timeout_millis: i32,
    /// Identifies the persistent session; the empty key is a valid session.
    pub session_key: String,
    /// Source text submitted with this request.
    pub code: String,
}

impl Request {
    /// Builds a request for the given session.
    #[must_use]
    pub fn new(session_key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            timeout_millis: 0,
            session_key: session_key.into(),
            code: code.into(),
        }
    }

    /// Sets the advisory timeout carried on the wire.
    #[must_use]
    pub const fn with_timeout_millis(mut self, timeout_millis: i32) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }
}
