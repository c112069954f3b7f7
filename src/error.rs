/// Error types for ClariMed
///
/// One enum for every failure the pipeline, adapters and storage can raise;
/// the HTTP layer maps it to status codes.
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR service error: {0}")]
    Ocr(String),

    #[error("LLM service error: {0}")]
    Llm(String),

    #[error("Knowledge lookup error: {0}")]
    Knowledge(String),

    #[error("Speech service error: {0}")]
    Tts(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model output that cannot take the ProcessResult shape
    #[error("Schema violation in `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn schema_violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        AppError::Other(format!("Lock poisoned: {}", error))
    }
}
