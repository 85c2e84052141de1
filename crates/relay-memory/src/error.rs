use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("history write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for relay_core::RelayError {
    fn from(e: StoreError) -> Self {
        relay_core::RelayError::Storage(e.to_string())
    }
}
