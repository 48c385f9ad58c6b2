//! Error types for the Remux engine.

use thiserror::Error;

/// Main error type for manifest synthesis.
///
/// Per-format defects are never errors; unusable formats are dropped and
/// processing continues. Cancellation is likewise not an error, it is a
/// distinct outcome reported by the selector.
#[derive(Error, Debug)]
pub enum Error {
    /// The top-level media info is structurally unusable.
    #[error("Unusable media info: {0}")]
    InputShape(String),

    /// No synthesis strategy produced a manifest.
    #[error("No strategy produced a playable manifest")]
    Exhausted,

    /// XML serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an input shape error.
    pub fn input_shape(msg: impl Into<String>) -> Self {
        Error::InputShape(msg.into())
    }

    /// Create an XML error from any displayable serializer failure.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        Error::Xml(err.to_string())
    }

    /// Check if this is the strategy exhaustion error.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::Exhausted)
    }
}
