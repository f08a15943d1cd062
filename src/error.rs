//! Error types for the page cloner

use thiserror::Error;

/// Result type alias for cloner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cloning a page
#[derive(Error, Debug)]
pub enum Error {
    /// The target page could not be rendered; aborts the whole job
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Rendering generated markup failed
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Decoding, encoding or resampling a screenshot failed
    #[error("Image processing failed: {0}")]
    ImageError(String),

    /// The pixel comparator rejected its input
    #[error("Scoring failed: {0}")]
    ScoreError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Persisting an inspection artifact failed
    #[error("Artifact write failed: {0}")]
    ArtifactError(String),

    /// An adjustment touched the structure of the layout model
    #[error("Layout structure changed during refinement (before {before}, after {after})")]
    StructureViolation { before: String, after: String },

    /// The caller stopped the job between iterations
    #[error("Job cancelled")]
    Cancelled,

    /// Layout model (de)serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::RenderError(err.to_string())
    }
}
