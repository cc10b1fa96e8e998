pub mod client;
pub mod codec;
pub mod compress;
pub mod connection;
pub mod datatypes;
pub mod frame;
pub mod server;


// Re-export the wire-level types for direct access
pub use connection::{
    Connection, ConnectionEvent, SessionState, BUFFER_MAX_SIZE, QUEUE_MAX_SIZE,
};
pub use datatypes::{
    ChatText, Command, KeyEvent, MouseEvent, Point, WindowHandle, CHAT_MSG_MAX_SIZE,
};
pub use frame::Frame;

// Re-export the endpoint APIs for easy access
pub use client::{Client, ClientError, ClientResult};
pub use server::{CaptureSource, EventSink, Server, ServerConfig, ServerError};

/// Error returned by most functions.
///
/// The hot paths (frame parsing, payload decoding) define their own error
/// enums because incomplete or malformed input is hit and handled during
/// normal execution; a boxed error there would cost an allocation per
/// partial read. Everywhere else a boxed `std::error::Error` is sufficient.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for session protocol operations.
///
/// # Examples
///
/// Hosting a window and reacting to injected input:
///
/// ```rust,no_run
/// use remwin::server::{Server, ServerConfig, EventSink};
/// use remwin::Point;
///
/// struct LogSink;
///
/// impl EventSink for LogSink {
///     fn mouse_move(&mut self, position: Point) {
///         println!("pointer at {position:?}");
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> remwin::Result<()> {
///     let source = |_window: Option<u64>, _quality: f32| -> Option<Vec<u8>> {
///         None // plug a platform screen grabber in here
///     };
///
///     let server = Server::start(
///         ServerConfig::default().with_window(0x02a0_0007),
///         Some(Box::new(source)),
///         LogSink,
///     )
///     .await?;
///
///     // ... run until told to stop ...
///     server.stop().await;
///     Ok(())
/// }
/// ```
///
/// Viewing a shared window:
///
/// ```rust,no_run
/// use remwin::client::Client;
/// use remwin::{compress, ConnectionEvent};
///
/// #[tokio::main]
/// async fn main() -> remwin::Result<()> {
///     let mut client = Client::connect("127.0.0.1:55555").await?;
///     client.wait_joined().await?;
///
///     while let Some(event) = client.next_event().await {
///         if let ConnectionEvent::WindowCaptureReceived(blob) = event {
///             let jpeg = compress::decompress(&blob)?;
///             // decode and display the JPEG
///             drop(jpeg);
///         }
///     }
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
