use std::time::Duration;

use thiserror::Error;

/// Hard failures of the extraction stage. Any of these halts the case.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("timed out after {waited:?} waiting for text detection of {uri}")]
    ExtractionTimeout {
        uri: String,
        waited: Duration,
    },

    #[error("unsupported or empty extraction for {uri}")]
    UnsupportedFormat { uri: String },
}

/// Transport or service errors from an OCR backend.
#[derive(Debug, Error)]
pub enum OcrError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("OCR service error: {0}")]
    Service(String),
}
