use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StopwatchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed stopwatch record: {0}")]
    MalformedRecord(String),

    #[error(
        "invalid duration '{input}'. Use HH:MM:SS, MM:SS, or a whole number of minutes"
    )]
    InvalidDuration { input: String },

    #[error("category '{0}' not found")]
    CategoryNotFound(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("unsupported shell: {0}. Use bash, zsh, or fish")]
    UnsupportedShell(String),

    #[error("could not start logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, StopwatchError>;
