// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),

    #[error("Unknown snapshot kind: {0}")]
    UnknownSnapshotKind(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
