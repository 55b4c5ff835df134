//! OCR capability: immediate detection on bytes, or a background job on a stored object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::OcrError;

/// One detected text block. Only `LINE` blocks contribute to extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(alias = "BlockType")]
    pub block_type: String,
    #[serde(default, alias = "Text")]
    pub text: String,
}

impl TextBlock {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            block_type: "LINE".into(),
            text: text.into(),
        }
    }

    pub fn word(text: impl Into<String>) -> Self {
        Self {
            block_type: "WORD".into(),
            text: text.into(),
        }
    }

    pub fn is_line(&self) -> bool {
        self.block_type.eq_ignore_ascii_case("LINE")
    }
}

/// Text of the `LINE` blocks, in detection order.
pub fn line_texts(blocks: &[TextBlock]) -> Vec<String> {
    blocks
        .iter()
        .filter(|b| b.is_line())
        .map(|b| b.text.clone())
        .collect()
}

/// Background job status. Only `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One page of job results. `blocks` is only meaningful once the job succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPage {
    #[serde(alias = "JobStatus")]
    pub status: JobStatus,
    #[serde(default, alias = "Blocks")]
    pub blocks: Vec<TextBlock>,
    #[serde(default, alias = "NextToken")]
    pub next_token: Option<String>,
}

#[async_trait]
pub trait Ocr: Send + Sync {
    /// Detect text in an image payload.
    async fn detect(&self, bytes: &[u8]) -> Result<Vec<TextBlock>, OcrError>;

    /// Start a background detection job on a stored object. Returns the job id.
    async fn start_job(&self, container: &str, key: &str) -> Result<String, OcrError>;

    /// Fetch job status and, once succeeded, a page of results.
    ///
    /// `next_token` selects a continuation page returned by a previous call.
    async fn job_page(&self, job_id: &str, next_token: Option<&str>)
    -> Result<JobPage, OcrError>;
}
