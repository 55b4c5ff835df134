//! HTTP client for a chat-style generation endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{Inference, InferenceError};

pub struct HttpInference {
    client: reqwest::Client,
    endpoint: String,
    model_id: Option<String>,
}

impl HttpInference {
    /// `endpoint` is the full URL that accepts the chat request. Every request
    /// is bounded by `timeout`.
    pub fn new(
        endpoint: String,
        model_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model_id: model_id.filter(|m| !m.trim().is_empty()),
        })
    }
}

#[async_trait]
impl Inference for HttpInference {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let model = self.model_id.as_deref().ok_or(InferenceError::NotConfigured)?;

        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": [{ "text": prompt }] }],
        });
        info!(endpoint = %self.endpoint, model, prompt_chars = prompt.len(), "invoking model");

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(InferenceError::Server {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!(bytes = text.len(), "model replied");
        Ok(reply_text(&text))
    }

    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }
}

/// Pull the generated text out of a response body.
///
/// Understands `output.message.content[].text` and `outputs[0].content[].text`;
/// any other body is returned unchanged.
fn reply_text(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    let joined = |content: Option<&Value>, sep: &str| -> Option<String> {
        let texts: Vec<&str> = content?
            .as_array()?
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        let text = texts.join(sep).trim().to_string();
        (!text.is_empty()).then_some(text)
    };

    joined(value.pointer("/output/message/content"), "")
        .or_else(|| joined(value.pointer("/outputs/0/content"), "\n"))
        .unwrap_or_else(|| body.to_string())
}
