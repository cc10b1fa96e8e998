use crate::datatypes::WindowHandle;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 55555;

/// Default delay between capture ticks (40 fps).
pub const WINDOW_UPDATE_DELAY_DEFAULT: Duration = Duration::from_millis(25);

/// Lower bound on the capture tick delay.
pub const WINDOW_UPDATE_DELAY_MIN: Duration = Duration::from_millis(5);

/// Default JPEG quality handed to the capture source.
pub const QUALITY_DEFAULT: f32 = 0.75;

/// Host configuration block.
///
/// Plain data; the capture source and event sink are passed separately to
/// [`Server::start`](crate::server::Server::start) because they are live
/// objects, not settings.
///
/// # Example
///
/// ```rust
/// use remwin::server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_port(7100)
///     .with_update_delay(Duration::from_millis(10))
///     .with_quality(0.9)
///     .with_window(0x5400_0007);
/// ```
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// TCP listen port. Port 0 binds an ephemeral port, useful in tests.
    pub port: u16,

    /// Delay between capture ticks. Clamped to at least
    /// [`WINDOW_UPDATE_DELAY_MIN`]; a shorter period would spend the whole
    /// tick budget on encoding.
    pub update_delay: Duration,

    /// JPEG quality in `[0.0, 1.0]`, forwarded to the capture source.
    pub quality: f32,

    /// The window being shared, if any. Forwarded opaquely to the capture
    /// source; with no window and no source that can work without one, the
    /// tick sends nothing.
    pub window: Option<WindowHandle>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: DEFAULT_PORT,
            update_delay: WINDOW_UPDATE_DELAY_DEFAULT,
            quality: QUALITY_DEFAULT,
            window: None,
        }
    }
}

impl ServerConfig {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the capture tick delay, clamped to the minimum.
    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay.max(WINDOW_UPDATE_DELAY_MIN);
        self
    }

    /// Set the JPEG quality, clamped into `[0.0, 1.0]`.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn with_window(mut self, window: WindowHandle) -> Self {
        self.window = Some(window);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 55555);
        assert_eq!(config.update_delay, Duration::from_millis(25));
        assert!(config.window.is_none());
    }

    #[test]
    fn update_delay_is_clamped() {
        let config = ServerConfig::default().with_update_delay(Duration::from_millis(1));
        assert_eq!(config.update_delay, WINDOW_UPDATE_DELAY_MIN);

        let config = ServerConfig::default().with_update_delay(Duration::from_millis(100));
        assert_eq!(config.update_delay, Duration::from_millis(100));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(ServerConfig::default().with_quality(1.7).quality, 1.0);
        assert_eq!(ServerConfig::default().with_quality(-0.3).quality, 0.0);
        assert_eq!(ServerConfig::default().with_quality(0.5).quality, 0.5);
    }
}
