use crate::codec::{decode_u32, CodecError, Decodable, Encodable};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// Maximum chat message length in characters before truncation applies.
pub const CHAT_MSG_MAX_SIZE: usize = 1024;

// A truncated message keeps this many characters and gains the ellipsis
// marker, staying under CHAT_MSG_MAX_SIZE.
const CHAT_TRUNCATE_LEN: usize = 1000;
const ELLIPSIS: &str = "...";

/// Chat text payload.
///
/// Wire layout: `u32` little-endian byte length followed by that many UTF-8
/// bytes. Construction truncates over-long input to [`CHAT_TRUNCATE_LEN`]
/// characters plus an ellipsis marker, so a `ChatText` is always within
/// [`CHAT_MSG_MAX_SIZE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    /// Build a chat payload, truncating over-long input.
    pub fn new(text: &str) -> Self {
        if text.chars().count() <= CHAT_MSG_MAX_SIZE {
            return ChatText(text.to_string());
        }

        let mut truncated: String = text.chars().take(CHAT_TRUNCATE_LEN).collect();
        truncated.push_str(ELLIPSIS);
        ChatText(truncated)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<ChatText> for String {
    fn from(text: ChatText) -> String {
        text.0
    }
}

impl Encodable for ChatText {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.0.len() as u32);
        buf.put_slice(self.0.as_bytes());
    }
}

impl Decodable for ChatText {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let len = decode_u32(buf)? as usize;
        if buf.remaining() < len {
            return Err(CodecError::Incomplete);
        }

        let bytes = buf.copy_to_bytes(len);
        let text = String::from_utf8(bytes.to_vec()).map_err(|source| CodecError::Utf8Error {
            field: "chat_text",
            source,
        })?;

        // Inbound text passes through the same cap as outbound text so a
        // peer that skips truncation cannot push an oversized string at us.
        Ok(ChatText::new(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let text = ChatText::new("hello there");
        let payload = text.to_payload();

        let mut cursor = Cursor::new(payload.as_ref());
        assert_eq!(ChatText::decode(&mut cursor).unwrap(), text);
    }

    #[test]
    fn short_text_is_untouched() {
        let text = ChatText::new("hi");
        assert_eq!(text.as_str(), "hi");
    }

    #[test]
    fn exactly_max_is_untouched() {
        let input = "a".repeat(CHAT_MSG_MAX_SIZE);
        assert_eq!(ChatText::new(&input).as_str(), input);
    }

    #[test]
    fn over_long_text_truncates_with_ellipsis() {
        let input = "x".repeat(2000);
        let text = ChatText::new(&input);

        assert_eq!(text.as_str().chars().count(), 1003);
        assert!(text.as_str().ends_with("..."));
        assert!(text.as_str().starts_with("xxx"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multi-byte characters must not be split mid-sequence.
        let input = "\u{00e9}".repeat(2000);
        let text = ChatText::new(&input);

        assert_eq!(text.as_str().chars().count(), 1003);
        assert!(text.as_str().ends_with("..."));
    }

    #[test]
    fn length_prefix_counts_bytes() {
        let text = ChatText::new("abc");
        let payload = text.to_payload();
        assert_eq!(&payload.as_ref()[..4], &[3, 0, 0, 0]);
        assert_eq!(&payload.as_ref()[4..], b"abc");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_slice(&[0xff, 0xfe]);

        let bytes = buf.freeze();
        let mut cursor = Cursor::new(bytes.as_ref());
        assert!(matches!(
            ChatText::decode(&mut cursor),
            Err(CodecError::Utf8Error { .. })
        ));
    }

    #[test]
    fn decode_rejects_short_body() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(10);
        buf.put_slice(b"abc");

        let bytes = buf.freeze();
        let mut cursor = Cursor::new(bytes.as_ref());
        assert!(matches!(
            ChatText::decode(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }
}
