// ABOUTME: Defines the wire command codes shared by host and viewer endpoints
// ABOUTME: Implements the stable numeric mapping and handshake classification

use num_enum::FromPrimitive;

/// Command code carried in the header field of every wire frame.
///
/// The numeric values are stable wire contract: both peers render the code as
/// an ASCII decimal string and base64-encode it into the frame header, so the
/// mapping below must never be reordered.
///
/// Codes that do not map to a known command decode as [`Command::Unknown`]
/// and are dropped by the connection state machine rather than failing the
/// stream.
#[derive(FromPrimitive)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Catch-all for unrecognized command codes.
    #[num_enum(default)]
    Unknown = 0,

    // Session handshake
    /// Request to open a session; answered with `JoinSessionAck`.
    JoinSession = 1,
    /// Acknowledges a `JoinSession`; both peers are now joined.
    JoinSessionAck = 2,
    /// Graceful session teardown notice.
    LeaveSession = 3,

    // Host → viewer
    /// Compressed window snapshot blob.
    WindowCapture = 4,

    // Viewer → host input injection
    MouseMove = 5,
    MousePress = 6,
    MouseRelease = 7,
    MouseClick = 8,
    KeyPress = 9,
    KeyRelease = 10,

    // Bidirectional
    /// Length-prefixed UTF-8 chat text.
    ChatMessage = 11,
}

impl Command {
    /// Whether this command participates in the session handshake.
    ///
    /// Handshake commands are the only ones a connection may transmit while
    /// the session is not yet (or no longer) joined.
    pub fn is_handshake(self) -> bool {
        matches!(
            self,
            Command::JoinSession | Command::JoinSessionAck | Command::LeaveSession
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_wire_values() {
        assert_eq!(Command::Unknown as u8, 0);
        assert_eq!(Command::JoinSession as u8, 1);
        assert_eq!(Command::JoinSessionAck as u8, 2);
        assert_eq!(Command::LeaveSession as u8, 3);
        assert_eq!(Command::WindowCapture as u8, 4);
        assert_eq!(Command::MouseMove as u8, 5);
        assert_eq!(Command::MousePress as u8, 6);
        assert_eq!(Command::MouseRelease as u8, 7);
        assert_eq!(Command::MouseClick as u8, 8);
        assert_eq!(Command::KeyPress as u8, 9);
        assert_eq!(Command::KeyRelease as u8, 10);
        assert_eq!(Command::ChatMessage as u8, 11);
    }

    #[test]
    fn unknown_is_the_catch_all() {
        assert_eq!(Command::from(12u8), Command::Unknown);
        assert_eq!(Command::from(255u8), Command::Unknown);
    }

    #[test]
    fn handshake_classification() {
        assert!(Command::JoinSession.is_handshake());
        assert!(Command::JoinSessionAck.is_handshake());
        assert!(Command::LeaveSession.is_handshake());
        assert!(!Command::WindowCapture.is_handshake());
        assert!(!Command::MouseClick.is_handshake());
        assert!(!Command::ChatMessage.is_handshake());
        assert!(!Command::Unknown.is_handshake());
    }
}
