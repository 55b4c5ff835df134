use thiserror::Error;

/// Failures of the inference capability. Analyzers absorb all of these.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no model id configured")]
    NotConfigured,

    #[error("inference service unavailable: {0}")]
    Unavailable(String),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
