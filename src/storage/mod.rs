pub mod json_file;
pub mod task_outputs;

pub use json_file::JsonFileHandler;
pub use task_outputs::{KickoffTaskOutputsStorage, StoredTaskOutput};

/// Storage backend error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Connection failed: {0}")]
    ConnectionError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
