use crate::codec::{decode_i32, CodecError, Decodable, Encodable};
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// Window-relative pointer position.
///
/// Encoded as two little-endian `i32` fields (`x`, `y`). Coordinates are
/// relative to the shared window's top-left corner; negative values can occur
/// when a viewer drags outside the window bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl Encodable for Point {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.x);
        buf.put_i32_le(self.y);
    }
}

impl Decodable for Point {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let x = decode_i32(buf)?;
        let y = decode_i32(buf)?;
        Ok(Point { x, y })
    }
}
