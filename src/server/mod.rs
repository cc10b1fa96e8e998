//! Window sharing host.
//!
//! The server half of the session protocol: a TCP listener that runs one
//! connection task per viewer, a periodic capture tick that broadcasts
//! compressed window snapshots to every joined viewer, and event routing
//! that feeds injected pointer/keyboard/chat traffic into host-supplied
//! sinks.
//!
//! The extension points are deliberately small:
//!
//! * [`CaptureSource`] produces the encoded image blob each tick. Screen
//!   grabbing is platform territory, so the core takes a source instead of
//!   shipping one; any matching closure works.
//! * [`EventSink`] receives the input events viewers inject. A host
//!   typically forwards these into its windowing layer's synthetic-event
//!   API. `()` is the null sink.
//!
//! See [`Server`] for a usage example.

pub mod config;
pub mod hub;
pub mod traits;

pub use config::{
    ServerConfig, DEFAULT_PORT, QUALITY_DEFAULT, WINDOW_UPDATE_DELAY_DEFAULT,
    WINDOW_UPDATE_DELAY_MIN,
};
pub use hub::{Server, ServerError};
pub use traits::{CaptureSource, EventSink};
