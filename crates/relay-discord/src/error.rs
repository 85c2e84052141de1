/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("no bot token configured")]
    NoToken,
}

/// Errors from turning attachment bytes into model input.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
