//! Encoders and decoders for request and response frames.

use std::io::{self, Read, Write};

use super::{ProtocolError, Request};

/// Size of the fixed request header in bytes.
pub const HEADER_LEN: usize = 12;

/// Largest combined key and code payload the daemon will buffer.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Largest response payload a client will buffer.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Reads one request from the stream.
///
/// Returns `Ok(None)` when the peer closes the stream before the header or
/// body is complete. Key and code bytes are decoded lossily, so invalid UTF-8
/// becomes U+FFFD rather than an error.
pub fn read_request<R: Read>(reader: &mut R) -> Result<Option<Request>, ProtocolError> {
    let mut header = [0_u8; HEADER_LEN];
    if !fill(reader, &mut header)? {
        return Ok(None);
    }

    let [t0, t1, t2, t3, k0, k1, k2, k3, c0, c1, c2, c3] = header;
    let timeout_millis = i32::from_le_bytes([t0, t1, t2, t3]);
    let key_len = length("key", i32::from_le_bytes([k0, k1, k2, k3]))?;
    let code_len = length("code", i32::from_le_bytes([c0, c1, c2, c3]))?;

    let body_len = key_len.saturating_add(code_len);
    if body_len > MAX_REQUEST_BYTES {
        return Err(ProtocolError::RequestTooLarge {
            size: body_len,
            max_size: MAX_REQUEST_BYTES,
        });
    }

    let mut body = vec![0_u8; body_len];
    if !fill(reader, &mut body)? {
        return Ok(None);
    }

    let (key, code) = body.split_at(key_len);
    Ok(Some(Request {
        timeout_millis,
        session_key: String::from_utf8_lossy(key).into_owned(),
        code: String::from_utf8_lossy(code).into_owned(),
    }))
}

/// Writes one response frame and flushes the stream.
pub fn write_response<W: Write>(writer: &mut W, text: &str) -> Result<(), ProtocolError> {
    let bytes = text.as_bytes();
    let len = frame_length(bytes.len()).ok_or(ProtocolError::ResponseTooLarge {
        size: bytes.len(),
        max_size: max_frame_len(),
    })?;
    writer
        .write_all(&len.to_le_bytes())
        .and_then(|()| writer.write_all(bytes))
        .and_then(|()| writer.flush())
        .map_err(ProtocolError::write)
}

/// Writes one request frame and flushes the stream.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<(), ProtocolError> {
    let key = request.session_key.as_bytes();
    let code = request.code.as_bytes();
    let too_large = || ProtocolError::RequestTooLarge {
        size: key.len().saturating_add(code.len()),
        max_size: MAX_REQUEST_BYTES,
    };
    if key.len().saturating_add(code.len()) > MAX_REQUEST_BYTES {
        return Err(too_large());
    }
    let key_len = frame_length(key.len()).ok_or_else(too_large)?;
    let code_len = frame_length(code.len()).ok_or_else(too_large)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + key.len() + code.len());
    frame.extend_from_slice(&request.timeout_millis.to_le_bytes());
    frame.extend_from_slice(&key_len.to_le_bytes());
    frame.extend_from_slice(&code_len.to_le_bytes());
    frame.extend_from_slice(key);
    frame.extend_from_slice(code);
    writer
        .write_all(&frame)
        .and_then(|()| writer.flush())
        .map_err(ProtocolError::write)
}

/// Reads one response frame.
///
/// Returns `Ok(None)` when the daemon closed the connection without a
/// complete response.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut header = [0_u8; 4];
    if !fill(reader, &mut header)? {
        return Ok(None);
    }
    let len = length("text", i32::from_le_bytes(header))?;
    if len > MAX_RESPONSE_BYTES {
        return Err(ProtocolError::ResponseTooLarge {
            size: len,
            max_size: MAX_RESPONSE_BYTES,
        });
    }

    let mut body = vec![0_u8; len];
    if !fill(reader, &mut body)? {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&body).into_owned()))
}

/// Fills `buffer` completely; `Ok(false)` signals end-of-stream.
fn fill<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<bool, ProtocolError> {
    match reader.read_exact(buffer) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(error) => Err(ProtocolError::read(error)),
    }
}

fn length(field: &'static str, value: i32) -> Result<usize, ProtocolError> {
    usize::try_from(value).map_err(|_| ProtocolError::NegativeLength { field, value })
}

fn frame_length(len: usize) -> Option<i32> {
    i32::try_from(len).ok()
}

/// Longest payload an `i32` length prefix can describe.
fn max_frame_len() -> usize {
    usize::try_from(i32::MAX).unwrap_or(usize::MAX)
}
