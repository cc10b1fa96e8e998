use crate::codec::{decode_i32, CodecError, Decodable, Encodable};
use crate::datatypes::Point;
use bytes::{BufMut, BytesMut};
use std::io::Cursor;

/// Pointer event payload shared by `MousePress`, `MouseRelease` and
/// `MouseClick`.
///
/// Wire layout (all little-endian): `i32 button | Point | i32 modifiers`,
/// 16 bytes total. `button` and `modifiers` are opaque codes defined by the
/// host windowing layer; they are transported unchanged end-to-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: i32,
    pub position: Point,
    pub modifiers: i32,
}

impl MouseEvent {
    /// Encoded size in bytes.
    pub const SIZE: usize = 4 + Point::SIZE + 4;

    pub fn new(button: i32, position: Point, modifiers: i32) -> Self {
        MouseEvent {
            button,
            position,
            modifiers,
        }
    }
}

impl Encodable for MouseEvent {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.button);
        self.position.encode(buf);
        buf.put_i32_le(self.modifiers);
    }
}

impl Decodable for MouseEvent {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let button = decode_i32(buf)?;
        let position = Point::decode(buf)?;
        let modifiers = decode_i32(buf)?;
        Ok(MouseEvent {
            button,
            position,
            modifiers,
        })
    }
}
