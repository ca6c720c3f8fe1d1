use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Validation(String),
    Storage(String),
    CorruptData(String),
    Conflict(String),
    Notification(String),
    NotFound(String),
    Config(String),
}

impl AppError {
    /// Message safe to show to the visitor (no "kind:" prefix).
    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(msg)
            | AppError::Storage(msg)
            | AppError::CorruptData(msg)
            | AppError::Conflict(msg)
            | AppError::Notification(msg)
            | AppError::NotFound(msg)
            | AppError::Config(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::CorruptData(msg) => write!(f, "Corrupt persisted data: {}", msg),
            AppError::Conflict(msg) => write!(f, "Write conflict: {}", msg),
            AppError::Notification(msg) => write!(f, "Notification error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::CorruptData(e.to_string())
    }
}
