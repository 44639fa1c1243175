//! Error types for the consumer runtime

use thiserror::Error;

/// Result type for consumer runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the consumer runtime
#[derive(Debug, Error)]
pub enum Error {
    /// Broker connection, channel, or consume failures
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// Document store connection or write failures
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),

    /// Failures reported by a custom record sink
    #[error("sink error: {0}")]
    Sink(String),
}
