// Error types for the download pipeline
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid download request: {0}")]
    InvalidRequest(String),

    #[error("failed to launch downloader: {0}")]
    SpawnFailure(String),

    #[error("maximum concurrent downloads reached ({active}/{limit})")]
    TooManyActive { active: usize, limit: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
