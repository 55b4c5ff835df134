//! HTTP client for a JSON text-detection service.
//!
//! Endpoints, relative to the base URL:
//!
//! - `POST /detect` with the raw image bytes → `{"blocks": [...]}`
//! - `POST /jobs` with `{"container", "key"}` → `{"job_id"}`
//! - `GET /jobs/{job_id}[?next_token=..]` → `{"status", "blocks", "next_token"}`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::ocr::{JobPage, Ocr, TextBlock};
use crate::OcrError;

pub struct HttpOcr {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    blocks: Vec<TextBlock>,
}

#[derive(Deserialize)]
struct StartResponse {
    job_id: String,
}

impl HttpOcr {
    /// `base_url` should be like `http://localhost:8081` (a trailing slash is trimmed).
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, OcrError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Ocr for HttpOcr {
    async fn detect(&self, bytes: &[u8]) -> Result<Vec<TextBlock>, OcrError> {
        let url = format!("{}/detect", self.base_url);
        debug!(url = %url, bytes = bytes.len(), "detecting text");
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await?;
        let parsed: DetectResponse = Self::check(resp).await?.json().await?;
        Ok(parsed.blocks)
    }

    async fn start_job(&self, container: &str, key: &str) -> Result<String, OcrError> {
        let url = format!("{}/jobs", self.base_url);
        info!(url = %url, container, key, "starting text detection job");
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "container": container, "key": key }))
            .send()
            .await?;
        let parsed: StartResponse = Self::check(resp).await?.json().await?;
        Ok(parsed.job_id)
    }

    async fn job_page(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<JobPage, OcrError> {
        let url = format!("{}/jobs/{job_id}", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(token) = next_token {
            req = req.query(&[("next_token", token)]);
        }
        let resp = req.send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = HttpOcr::new("http://localhost:8081/".into(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:8081");
    }

    #[test]
    fn detect_response_defaults_to_no_blocks() {
        let parsed: DetectResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.blocks.is_empty());
    }
}
