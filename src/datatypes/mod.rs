mod chat;
mod command;
mod key;
mod mouse;
mod point;

pub use chat::{ChatText, CHAT_MSG_MAX_SIZE};
pub use command::Command;
pub use key::KeyEvent;
pub use mouse::MouseEvent;
pub use point::Point;

/// Opaque identifier of the host window being shared.
///
/// The core never interprets the value; it is handed verbatim to the
/// installed capture source, which maps it onto whatever the platform
/// windowing layer uses (an X11 window id, an HWND, ...).
pub type WindowHandle = u64;
