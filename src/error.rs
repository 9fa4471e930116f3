//! Error types for sheetdiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetdiffError>;

#[derive(Error, Debug)]
pub enum SheetdiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("Fuzzy matching refused: file {side} has {rows} rows, limit is {limit}. Use exact matching or reduce the data")]
    MatchSizeExceeded {
        side: char,
        rows: usize,
        limit: usize,
    },

    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl SheetdiffError {
    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace(msg.into())
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    pub fn template_not_found(name: impl Into<String>) -> Self {
        Self::TemplateNotFound { name: name.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
