use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Channel error ({channel}): {reason}")]
    Channel { channel: String, reason: String },
}

impl RelayError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::Storage(_) => "STORAGE_ERROR",
            RelayError::Channel { .. } => "CHANNEL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
