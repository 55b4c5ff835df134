//! Capabilities wired from command-line configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use covenant_ai::{HttpInference, Inference, InferenceError};
use covenant_extract::{HttpOcr, JobPage, Ocr, OcrError, TextBlock};

const NO_OCR: &str = "no OCR service configured (set --ocr-url or COVENANT_OCR_URL)";

/// Stand-in when no OCR endpoint is configured. Plain-text documents still work.
struct NoOcr;

#[async_trait]
impl Ocr for NoOcr {
    async fn detect(&self, _bytes: &[u8]) -> Result<Vec<TextBlock>, OcrError> {
        Err(OcrError::Service(NO_OCR.into()))
    }

    async fn start_job(&self, _container: &str, _key: &str) -> Result<String, OcrError> {
        Err(OcrError::Service(NO_OCR.into()))
    }

    async fn job_page(
        &self,
        _job_id: &str,
        _next_token: Option<&str>,
    ) -> Result<JobPage, OcrError> {
        Err(OcrError::Service(NO_OCR.into()))
    }
}

/// Stand-in when no inference endpoint is configured. Analyzers degrade.
struct NoInference;

#[async_trait]
impl Inference for NoInference {
    async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::NotConfigured)
    }
}

pub fn ocr(url: Option<&str>, timeout: Duration) -> anyhow::Result<Arc<dyn Ocr>> {
    Ok(match url {
        Some(url) => Arc::new(HttpOcr::new(url.to_string(), timeout)?),
        None => Arc::new(NoOcr),
    })
}

pub fn inference(
    url: Option<&str>,
    model_id: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<Arc<dyn Inference>> {
    Ok(match url {
        Some(url) => Arc::new(HttpInference::new(
            url.to_string(),
            model_id.map(str::to_string),
            timeout,
        )?),
        None => Arc::new(NoInference),
    })
}
