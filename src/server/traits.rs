// ABOUTME: Host-side extension points for the window sharing hub
// ABOUTME: Capture sources produce image blobs, event sinks consume injected input

use crate::datatypes::{MouseEvent, Point, WindowHandle};
use std::net::SocketAddr;

/// Produces an encoded image of the shared window on demand.
///
/// Called on the hub task once per capture tick; the implementation must not
/// block for longer than one tick interval. The returned blob is opaque to
/// the core (JPEG by convention, at the configured quality); the hub applies
/// the generic compression step before broadcasting it.
///
/// Returning `None` skips the tick, which is how a source reports "nothing
/// to capture" (window minimized, no window configured, grab failed).
///
/// Any matching `FnMut` closure is a capture source:
///
/// ```rust
/// use remwin::server::CaptureSource;
///
/// let mut frames = 0u32;
/// let mut source = |_window: Option<u64>, _quality: f32| {
///     frames += 1;
///     Some(format!("frame {frames}").into_bytes())
/// };
/// assert!(source.capture(None, 0.75).is_some());
/// ```
pub trait CaptureSource: Send {
    fn capture(&mut self, window: Option<WindowHandle>, quality: f32) -> Option<Vec<u8>>;
}

impl<F> CaptureSource for F
where
    F: FnMut(Option<WindowHandle>, f32) -> Option<Vec<u8>> + Send,
{
    fn capture(&mut self, window: Option<WindowHandle>, quality: f32) -> Option<Vec<u8>> {
        self(window, quality)
    }
}

/// Receives input and chat events the hub extracts from viewer traffic.
///
/// All methods are called on the hub task from within event delivery, in the
/// order the corresponding frames arrived on their connection. The default
/// implementations do nothing, so a host only overrides what it injects;
/// `()` is the null sink.
///
/// `button`, `key` and `modifiers` are opaque codes defined by the host
/// windowing layer; the hub forwards them untouched.
pub trait EventSink: Send + 'static {
    fn mouse_move(&mut self, position: Point) {
        let _ = position;
    }

    fn mouse_press(&mut self, event: MouseEvent) {
        let _ = event;
    }

    fn mouse_release(&mut self, event: MouseEvent) {
        let _ = event;
    }

    fn mouse_click(&mut self, event: MouseEvent) {
        let _ = event;
    }

    fn key_press(&mut self, key: i32, modifiers: i32) {
        let _ = (key, modifiers);
    }

    fn key_release(&mut self, key: i32, modifiers: i32) {
        let _ = (key, modifiers);
    }

    fn chat_message(&mut self, peer: SocketAddr, text: &str) {
        let _ = (peer, text);
    }
}

/// The null sink: discard every event.
impl EventSink for () {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_a_capture_source() {
        let mut source = |window: Option<WindowHandle>, quality: f32| {
            assert_eq!(window, Some(7));
            assert!((quality - 0.5).abs() < f32::EPSILON);
            Some(vec![1, 2, 3])
        };
        assert_eq!(source.capture(Some(7), 0.5), Some(vec![1, 2, 3]));
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = ();
        sink.mouse_move(Point::new(1, 2));
        sink.key_press(65, 0);
        sink.chat_message("127.0.0.1:1".parse().unwrap(), "hello");
    }
}
