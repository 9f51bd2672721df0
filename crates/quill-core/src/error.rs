//! Error types for quill-core

use thiserror::Error;

/// Result type alias for quill operations
pub type Result<T> = std::result::Result<T, QuillError>;

/// Main error type for quill operations
#[derive(Error, Debug)]
pub enum QuillError {
    /// Persistence-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input rejected before any store call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Chapter id is not part of the chapter list
    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Errors from a manuscript store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// A required form field is missing or a value is out of its allowed range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field left empty
    #[error("{message}")]
    Required {
        field: &'static str,
        message: &'static str,
    },

    /// Numeric field outside its allowed range
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },
}

impl ValidationError {
    /// Shorthand for a missing required field.
    pub fn required(field: &'static str, message: &'static str) -> Self {
        ValidationError::Required { field, message }
    }

    /// The field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field, .. } => field,
            ValidationError::OutOfRange { field, .. } => field,
        }
    }
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The config file could not be read or parsed
    #[error("Failed to load configuration: {0}")]
    Load(String),
}
