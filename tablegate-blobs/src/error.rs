use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, BlobError>;
