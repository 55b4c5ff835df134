use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("envelope JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage event: {0}")]
    InvalidEvent(String),
}
