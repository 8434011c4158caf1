//! Error types for Plotline.

use thiserror::Error;

/// Library-level error type for Plotline operations.
#[derive(Error, Debug)]
pub enum PlotlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid corpus data: {0}")]
    DataFormat(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Persisted index is incompatible: {0}")]
    IncompatibleIndex(String),

    #[error("No persisted index found at {0}")]
    IndexNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl PlotlineError {
    /// Whether this error means the persisted index should be rebuilt
    /// rather than treated as fatal.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            PlotlineError::IncompatibleIndex(_) | PlotlineError::IndexNotFound(_)
        )
    }
}

/// Result type alias for Plotline operations.
pub type Result<T> = std::result::Result<T, PlotlineError>;
