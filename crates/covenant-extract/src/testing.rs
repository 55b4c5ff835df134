//! Test doubles for the OCR capability.
//!
//! [`MockOcr`] returns scripted results and records every call so tests can
//! assert which extraction path was taken.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ocr::{JobPage, JobStatus, Ocr, TextBlock};
use crate::OcrError;

/// Record of a call made to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrCall {
    Detect { bytes: usize },
    StartJob { container: String, key: String },
    JobPage { job_id: String, next_token: Option<String> },
}

/// Which call of the mock never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stall {
    #[default]
    None,
    StartJob,
    /// Status polls (calls without a continuation token).
    Polls,
    /// Continuation pages after the job succeeded.
    Pages,
}

/// Scripted OCR backend.
///
/// Status polls consume `job_statuses` front to back; the last status repeats.
/// Once a poll reports `Succeeded` it carries the first result page, and
/// continuation tokens `page-2`, `page-3`, ... address the rest.
pub struct MockOcr {
    detect_lines: Vec<String>,
    detect_error: Option<String>,
    job_id: String,
    job_statuses: Mutex<VecDeque<JobStatus>>,
    job_pages: Vec<Vec<String>>,
    stall: Stall,
    calls: Mutex<Vec<OcrCall>>,
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOcr {
    pub fn new() -> Self {
        Self {
            detect_lines: Vec::new(),
            detect_error: None,
            job_id: "job-1".into(),
            job_statuses: Mutex::new(VecDeque::from([JobStatus::Succeeded])),
            job_pages: Vec::new(),
            stall: Stall::None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Lines returned by `detect`, each followed by a `WORD` block that must be ignored.
    pub fn with_detect_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detect_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_detect_error(mut self, message: impl Into<String>) -> Self {
        self.detect_error = Some(message.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn with_job_statuses(self, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        *self.job_statuses.lock().unwrap_or_else(|e| e.into_inner()) =
            statuses.into_iter().collect();
        self
    }

    pub fn with_job_pages(mut self, pages: Vec<Vec<&str>>) -> Self {
        self.job_pages = pages
            .into_iter()
            .map(|p| p.into_iter().map(str::to_string).collect())
            .collect();
        self
    }

    pub fn with_stall(mut self, stall: Stall) -> Self {
        self.stall = stall;
        self
    }

    pub fn calls(&self) -> Vec<OcrCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: OcrCall) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn next_status(&self) -> JobStatus {
        let mut statuses = self.job_statuses.lock().unwrap_or_else(|e| e.into_inner());
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(JobStatus::InProgress)
        } else {
            statuses.front().copied().unwrap_or(JobStatus::InProgress)
        }
    }

    fn result_page(&self, index: usize) -> JobPage {
        let blocks = self
            .job_pages
            .get(index)
            .map(|lines| lines.iter().map(TextBlock::line).collect())
            .unwrap_or_default();
        let next_token = (index + 1 < self.job_pages.len()).then(|| format!("page-{}", index + 2));
        JobPage {
            status: JobStatus::Succeeded,
            blocks,
            next_token,
        }
    }
}

#[async_trait]
impl Ocr for MockOcr {
    async fn detect(&self, bytes: &[u8]) -> Result<Vec<TextBlock>, OcrError> {
        self.record(OcrCall::Detect { bytes: bytes.len() });
        if let Some(message) = &self.detect_error {
            return Err(OcrError::Service(message.clone()));
        }
        Ok(self
            .detect_lines
            .iter()
            .flat_map(|line| [TextBlock::line(line.as_str()), TextBlock::word(line.as_str())])
            .collect())
    }

    async fn start_job(&self, container: &str, key: &str) -> Result<String, OcrError> {
        self.record(OcrCall::StartJob {
            container: container.to_string(),
            key: key.to_string(),
        });
        if self.stall == Stall::StartJob {
            std::future::pending::<()>().await;
        }
        Ok(self.job_id.clone())
    }

    async fn job_page(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<JobPage, OcrError> {
        self.record(OcrCall::JobPage {
            job_id: job_id.to_string(),
            next_token: next_token.map(str::to_string),
        });

        if let Some(token) = next_token {
            if self.stall == Stall::Pages {
                std::future::pending::<()>().await;
            }
            let index = token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| OcrError::Service(format!("unknown continuation token {token}")))?;
            return Ok(self.result_page(index));
        }

        if self.stall == Stall::Polls {
            std::future::pending::<()>().await;
        }

        match self.next_status() {
            JobStatus::Succeeded => Ok(self.result_page(0)),
            status => Ok(JobPage {
                status,
                blocks: Vec::new(),
                next_token: None,
            }),
        }
    }
}
