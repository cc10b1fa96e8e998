//! Provides the wire frame envelope and a resynchronizing parser for reading
//! frames out of a TCP byte stream.
//!
//! One frame on the wire is:
//!
//! ```text
//! START (0x01)
//! base64(ascii-decimal(command))
//! PAYLOAD_SIZE_MARKER (0x11)
//! base64(ascii-decimal(payload_length))
//! PAYLOAD_MARKER (0x09)
//! payload bytes (raw)
//! END (0x04)
//! ```
//!
//! The payload length is authoritative; the END octet is a consistency check,
//! not a delimiter, so marker octets inside the payload are harmless. The
//! standard base64 alphabet contains none of the marker octets, which keeps
//! the header fields scan-safe as well.

use crate::datatypes::Command;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use core::fmt;

/// Start-of-frame marker (SOH).
pub const START_MARKER: u8 = 0x01;
/// Separates the command field from the payload-size field (DC1).
pub const PAYLOAD_SIZE_MARKER: u8 = 0x11;
/// Separates the payload-size field from the raw payload (HT).
pub const PAYLOAD_MARKER: u8 = 0x09;
/// End-of-frame consistency check octet (EOT).
pub const END_MARKER: u8 = 0x04;

/// One decoded wire message: a command code plus its uninterpreted payload.
///
/// The payload schema is selected by the command; decoding it is the job of
/// the typed payload codecs, not this layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub payload: Bytes,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Not enough data is available to parse a frame. This is a normal
    /// runtime condition, not a failure.
    Incomplete,

    /// The buffer contents cannot belong to any valid frame. The caller
    /// must discard the receive buffer and wait for a fresh start marker.
    Desync,
}

impl Frame {
    pub fn new(command: Command, payload: impl Into<Bytes>) -> Frame {
        Frame {
            command,
            payload: payload.into(),
        }
    }

    /// Encode this frame into its on-wire representation.
    pub fn encode(&self) -> Bytes {
        let command_field = BASE64.encode((self.command as u8).to_string());
        let size_field = BASE64.encode(self.payload.len().to_string());

        let mut buf = BytesMut::with_capacity(
            1 + command_field.len() + 1 + size_field.len() + 1 + self.payload.len() + 1,
        );
        buf.extend_from_slice(&[START_MARKER]);
        buf.extend_from_slice(command_field.as_bytes());
        buf.extend_from_slice(&[PAYLOAD_SIZE_MARKER]);
        buf.extend_from_slice(size_field.as_bytes());
        buf.extend_from_slice(&[PAYLOAD_MARKER]);
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&[END_MARKER]);
        buf.freeze()
    }

    /// Try to parse one frame out of `buffer`, consuming it (and any leading
    /// garbage before its start marker) on success.
    ///
    /// `Err(Incomplete)` is the normal "need more bytes" condition, not a
    /// failure: the caller keeps the buffer and reads more from the socket.
    /// `Err(Desync)` means the buffer can never complete into a valid frame;
    /// the caller clears it and the stream resynchronizes on the next start
    /// marker.
    ///
    /// Frames may be batched: call in a loop until `Err(Incomplete)`.
    pub fn parse(buffer: &mut BytesMut) -> Result<Frame, Error> {
        let Some(start) = find_marker(buffer, START_MARKER) else {
            return Err(Error::Incomplete);
        };
        let Some(size_idx) = find_marker(buffer, PAYLOAD_SIZE_MARKER) else {
            return Err(Error::Incomplete);
        };
        let Some(payload_idx) = find_marker(buffer, PAYLOAD_MARKER) else {
            return Err(Error::Incomplete);
        };

        // These are first occurrences, so an out-of-order triple can never
        // repair itself with more input.
        if !(start < size_idx && size_idx < payload_idx) {
            return Err(Error::Desync);
        }

        // An unparsable size field waits for the buffer cap to flush it.
        let Some(payload_len) = decode_decimal_field(&buffer[size_idx + 1..payload_idx]) else {
            return Err(Error::Incomplete);
        };

        // The length field is peer-controlled; a value that cannot even be
        // addressed can never complete into a frame.
        let Ok(payload_len) = usize::try_from(payload_len) else {
            return Err(Error::Desync);
        };
        let Some(end_idx) = payload_idx
            .checked_add(payload_len)
            .and_then(|idx| idx.checked_add(1))
        else {
            return Err(Error::Desync);
        };

        if end_idx >= buffer.len() {
            return Err(Error::Incomplete);
        }
        if buffer[end_idx] != END_MARKER {
            return Err(Error::Desync);
        }

        // An unrecognized command field still commits the frame; the state
        // machine drops Unknown messages without breaking the stream.
        let command = decode_decimal_field(&buffer[start + 1..size_idx])
            .and_then(|value| u8::try_from(value).ok())
            .map(Command::from)
            .unwrap_or(Command::Unknown);

        let consumed = buffer.split_to(end_idx + 1).freeze();
        let payload = consumed.slice(payload_idx + 1..payload_idx + 1 + payload_len);

        Ok(Frame { command, payload })
    }
}

fn find_marker(buffer: &[u8], marker: u8) -> Option<usize> {
    buffer.iter().position(|&byte| byte == marker)
}

/// Decode a `base64(ascii-decimal(n))` header field.
fn decode_decimal_field(field: &[u8]) -> Option<u64> {
    let decoded = BASE64.decode(field).ok()?;
    let text = std::str::from_utf8(&decoded).ok()?;
    text.parse().ok()
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Incomplete => "stream ended early".fmt(fmt),
            Error::Desync => "frame desynchronized; receive buffer discarded".fmt(fmt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(buffer: &mut BytesMut) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = Frame::parse(buffer) {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn encode_matches_wire_layout() {
        // MouseClick (8) with a 16 byte payload: command field "OA==",
        // size field "MTY=".
        let payload = vec![0xABu8; 16];
        let encoded = Frame::new(Command::MouseClick, payload.clone()).encode();

        let mut expected = vec![START_MARKER];
        expected.extend_from_slice(b"OA==");
        expected.push(PAYLOAD_SIZE_MARKER);
        expected.extend_from_slice(b"MTY=");
        expected.push(PAYLOAD_MARKER);
        expected.extend_from_slice(&payload);
        expected.push(END_MARKER);

        assert_eq!(encoded.as_ref(), expected.as_slice());
    }

    #[test]
    fn roundtrip_consumes_everything() {
        let frame = Frame::new(Command::ChatMessage, &b"hello"[..]);
        let mut buffer = BytesMut::from(frame.encode().as_ref());

        let parsed = Frame::parse(&mut buffer).unwrap();
        assert_eq!(parsed, frame);
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_payload_roundtrip() {
        let frame = Frame::new(Command::JoinSession, Bytes::new());
        let mut buffer = BytesMut::from(frame.encode().as_ref());

        let parsed = Frame::parse(&mut buffer).unwrap();
        assert_eq!(parsed.command, Command::JoinSession);
        assert!(parsed.payload.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn incomplete_frame_waits() {
        let encoded = Frame::new(Command::WindowCapture, vec![9u8; 64]).encode();
        let mut buffer = BytesMut::from(&encoded[..encoded.len() - 10]);

        assert_eq!(Frame::parse(&mut buffer), Err(Error::Incomplete));
        // Nothing consumed while waiting.
        assert_eq!(buffer.len(), encoded.len() - 10);
    }

    #[test]
    fn leading_garbage_is_discarded_with_the_frame() {
        let frame = Frame::new(Command::MouseMove, vec![1, 0, 0, 0, 2, 0, 0, 0]);
        let mut buffer = BytesMut::from(&b"zzzz"[..]);
        buffer.extend_from_slice(&frame.encode());

        let parsed = Frame::parse(&mut buffer).unwrap();
        assert_eq!(parsed, frame);
        assert!(buffer.is_empty());
    }

    #[test]
    fn batched_frames_parse_in_order() {
        let first = Frame::new(Command::KeyPress, vec![1u8; 8]);
        let second = Frame::new(Command::KeyRelease, vec![2u8; 8]);
        let third = Frame::new(Command::ChatMessage, &b"\x02\x00\x00\x00hi"[..]);

        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(&first.encode());
        buffer.extend_from_slice(&second.encode());
        buffer.extend_from_slice(&third.encode());

        assert_eq!(parse_all(&mut buffer), vec![first, second, third]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn markers_inside_payload_are_harmless() {
        let payload = vec![
            START_MARKER,
            PAYLOAD_SIZE_MARKER,
            PAYLOAD_MARKER,
            END_MARKER,
            0x42,
        ];
        let frame = Frame::new(Command::WindowCapture, payload);
        let mut buffer = BytesMut::from(frame.encode().as_ref());

        let parsed = Frame::parse(&mut buffer).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn bad_end_marker_is_a_desync() {
        let mut encoded = Frame::new(Command::MouseMove, vec![0u8; 8])
            .encode()
            .to_vec();
        let last = encoded.len() - 1;
        encoded[last] = 0x00;

        let mut buffer = BytesMut::from(encoded.as_slice());
        assert_eq!(Frame::parse(&mut buffer), Err(Error::Desync));
    }

    #[test]
    fn out_of_order_markers_are_a_desync() {
        // A payload marker strictly before the first start marker can never
        // order itself correctly, no matter how much input arrives.
        let mut buffer = BytesMut::from(&[PAYLOAD_MARKER, PAYLOAD_SIZE_MARKER, START_MARKER][..]);
        assert_eq!(Frame::parse(&mut buffer), Err(Error::Desync));
    }

    #[test]
    fn unknown_command_code_degrades_to_unknown() {
        // Command code 200 is not assigned.
        let field = BASE64.encode("200");
        let mut raw = vec![START_MARKER];
        raw.extend_from_slice(field.as_bytes());
        raw.push(PAYLOAD_SIZE_MARKER);
        raw.extend_from_slice(BASE64.encode("0").as_bytes());
        raw.push(PAYLOAD_MARKER);
        raw.push(END_MARKER);

        let mut buffer = BytesMut::from(raw.as_slice());
        let parsed = Frame::parse(&mut buffer).unwrap();
        assert_eq!(parsed.command, Command::Unknown);
    }

    #[test]
    fn overflowing_length_field_is_a_desync() {
        // u64::MAX as the declared payload length must not overflow the
        // end-of-frame arithmetic; it can never complete into a frame.
        let mut raw = vec![START_MARKER];
        raw.extend_from_slice(BASE64.encode("4").as_bytes());
        raw.push(PAYLOAD_SIZE_MARKER);
        raw.extend_from_slice(BASE64.encode("18446744073709551615").as_bytes());
        raw.push(PAYLOAD_MARKER);
        raw.push(END_MARKER);

        let mut buffer = BytesMut::from(raw.as_slice());
        assert_eq!(Frame::parse(&mut buffer), Err(Error::Desync));
    }

    #[test]
    fn garbage_size_field_waits_for_more() {
        // "!!" is not valid base64; the parser bails and leaves the buffer
        // for the overflow cap to clear.
        let mut raw = vec![START_MARKER];
        raw.extend_from_slice(BASE64.encode("5").as_bytes());
        raw.push(PAYLOAD_SIZE_MARKER);
        raw.extend_from_slice(b"!!");
        raw.push(PAYLOAD_MARKER);
        raw.push(END_MARKER);

        let mut buffer = BytesMut::from(raw.as_slice());
        assert_eq!(Frame::parse(&mut buffer), Err(Error::Incomplete));
    }

    #[test]
    fn byte_at_a_time_fragmentation() {
        let frame = Frame::new(Command::MousePress, vec![7u8; 16]);
        let encoded = frame.encode();

        let mut buffer = BytesMut::new();
        let mut decoded = Vec::new();
        for &byte in encoded.iter() {
            buffer.extend_from_slice(&[byte]);
            while let Ok(parsed) = Frame::parse(&mut buffer) {
                decoded.push(parsed);
            }
        }

        assert_eq!(decoded, vec![frame]);
        assert!(buffer.is_empty());
    }
}
