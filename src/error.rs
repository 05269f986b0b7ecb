use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by task commands and the task store.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Input rejected at the boundary. No state was changed.
    #[error("{0}")]
    Validation(String),

    #[error("Task {0} not found.")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed task store: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TaskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TaskError::Validation(msg.into())
    }

    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation(_) | TaskError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
