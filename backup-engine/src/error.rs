//! Engine error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Tabular decode error at line {line}: {message}")]
    TabularDecode { line: usize, message: String },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Unrecognized archive: {0}")]
    UnrecognizedArchive(String),

    #[error("Data client error: {0}")]
    DataClient(String),

    #[error("Restore failed for collection '{collection}': {message}")]
    Restore { collection: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Convenience constructor for data-client implementations.
    pub fn data_client(message: impl Into<String>) -> Self {
        EngineError::DataClient(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
