//! Error types for vqcpc-rs.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Candle tensor/model error.
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    /// Audio processing error (WAV I/O, companding).
    #[error("audio: {0}")]
    Audio(String),

    /// Checkpoint restore error.
    #[error("checkpoint: {0}")]
    Checkpoint(String),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// Speaker registry / synthesis list error.
    #[error("manifest: {0}")]
    Manifest(String),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<hound::Error> for Error {
    fn from(error: hound::Error) -> Self {
        Error::Audio(error.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Error::Manifest(error.to_string())
    }
}
