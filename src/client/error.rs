// ABOUTME: Viewer client error types covering connect, send and event delivery
// ABOUTME: Provides structured reporting with conversion from underlying I/O errors

use std::io;
use thiserror::Error;

/// Error type for viewer client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error during network operations (connect, read, write).
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The connection task has finished; no further traffic is possible.
    #[error("connection closed")]
    Closed,
}

/// Result type alias for viewer client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl From<Box<dyn std::error::Error + Send + Sync>> for ClientError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<io::Error>() {
            Ok(io_err) => ClientError::Connection(*io_err),
            Err(_) => ClientError::Closed,
        }
    }
}
