use async_trait::async_trait;
use serde_json::json;

use crate::InferenceError;

/// Generative text capability: prompt in, free text out.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Model identifier used for calls, if one is configured.
    fn model_id(&self) -> Option<&str> {
        None
    }
}

const FAILURE_SUGGESTION: &str = "Check that the inference endpoint is reachable and that the \
configured model id is valid and accessible.";

/// JSON document recorded as `raw_output` when an inference call fails.
pub fn failure_document(error: &InferenceError, model_id: Option<&str>) -> String {
    let summary = match error {
        InferenceError::NotConfigured => "Inference model id not configured",
        _ => "Inference invocation failed",
    };
    json!({
        "summary": summary,
        "error": error.to_string(),
        "suggestion": FAILURE_SUGGESTION,
        "model_id": model_id,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_document_is_json() {
        let doc = failure_document(
            &InferenceError::Unavailable("connection refused".into()),
            Some("nova-lite"),
        );
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["summary"], "Inference invocation failed");
        assert_eq!(
            value["error"],
            "inference service unavailable: connection refused"
        );
        assert_eq!(value["model_id"], "nova-lite");
        assert!(value["suggestion"].as_str().is_some());
    }

    #[test]
    fn missing_model_is_reported() {
        let doc = failure_document(&InferenceError::NotConfigured, None);
        let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["summary"], "Inference model id not configured");
        assert!(value["model_id"].is_null());
    }
}
