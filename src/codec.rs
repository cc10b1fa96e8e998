// ABOUTME: Separates typed payload encoding/decoding from the wire framing layer
// ABOUTME: Provides the Encodable/Decodable traits, CodecError and field helpers

use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Trait for payload types that can be encoded into a frame payload.
pub trait Encodable {
    /// Append the encoded representation to `buf`.
    fn encode(&self, buf: &mut BytesMut);

    /// Encode into a fresh payload buffer.
    fn to_payload(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Trait for payload types that can be decoded from a frame payload.
pub trait Decodable: Sized {
    /// Decode one value from the cursor, advancing past the consumed bytes.
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Decode from a complete payload slice.
    fn from_payload(payload: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(payload);
        Self::decode(&mut cursor)
    }
}

/// Payload decode errors.
///
/// A payload that fails to decode drops the enclosing message; it never
/// terminates the connection.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("incomplete payload: need more data")]
    Incomplete,

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Decode a little-endian `i32`.
pub fn decode_i32(buf: &mut Cursor<&[u8]>) -> Result<i32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_i32_le())
}

/// Decode a little-endian `u32`.
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32_le())
}
