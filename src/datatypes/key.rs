use crate::codec::{decode_i32, CodecError, Decodable, Encodable};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// Keyboard event payload shared by `KeyPress` and `KeyRelease`.
///
/// Wire layout (little-endian): `i32 key | i32 modifiers`. Both fields are
/// opaque codes defined by the host windowing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: i32,
    pub modifiers: i32,
}

impl KeyEvent {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    pub fn new(key: i32, modifiers: i32) -> Self {
        KeyEvent { key, modifiers }
    }
}

impl Encodable for KeyEvent {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.key);
        buf.put_i32_le(self.modifiers);
    }
}

impl Decodable for KeyEvent {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let key = decode_i32(buf)?;
        let modifiers = decode_i32(buf)?;
        Ok(KeyEvent { key, modifiers })
    }
}
