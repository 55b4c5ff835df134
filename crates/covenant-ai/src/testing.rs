//! Test doubles for the inference capability.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Inference, InferenceError};

/// Scripted inference backend that records every prompt it receives.
pub struct MockInference {
    reply: Result<String, String>,
    model_id: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockInference {
    /// Always answers with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            model_id: Some("mock-model".into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with [`InferenceError::Unavailable`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            ..Self::replying("")
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl Inference for MockInference {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.reply
            .clone()
            .map_err(InferenceError::Unavailable)
    }

    fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }
}
