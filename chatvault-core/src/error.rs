use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt manifest {path:?}: {reason}")]
    CorruptManifest { path: PathBuf, reason: String },

    #[error("no uploaded file with id {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, VaultError>;
