use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
