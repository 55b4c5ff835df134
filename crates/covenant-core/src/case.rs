//! Case identity and the extraction stage's output record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::resolve_tenant;

/// A stored document, addressed by container (bucket) and object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub container: String,
    pub key: String,
}

impl DocumentReference {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Canonical URI, e.g. `s3://contracts-bucket/acme/msa.pdf`.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.container, self.key)
    }

    /// Lower-cased file extension of the key's final segment, without the dot.
    ///
    /// Leading dots of the segment do not start an extension, so `acme/.pdf`
    /// has none.
    pub fn extension(&self) -> Option<String> {
        let segment = self.key.rsplit('/').next().unwrap_or_default();
        let (_, ext) = segment.trim_start_matches('.').rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// One document's journey through the pipeline.
///
/// The case id is fixed when the case is opened and threaded unchanged
/// through every later stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCase {
    pub case_id: String,
    pub document: DocumentReference,
    pub tenant_id: Option<String>,
}

impl ContractCase {
    /// Open a case, generating a fresh id when none (or an empty one) is supplied.
    pub fn open(case_id: Option<&str>, document: DocumentReference) -> Self {
        let case_id = match case_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let tenant_id = resolve_tenant(Some(&document.key));
        Self {
            case_id,
            document,
            tenant_id,
        }
    }
}

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Single synchronous OCR call on an image.
    OcrSync,
    /// Background OCR job, polled to completion.
    OcrAsync,
    /// Raw bytes decoded as text.
    PlainText,
    /// Unknown extension sent to OCR as an image.
    OcrFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OcrSync => "ocr_sync",
            Self::OcrAsync => "ocr_async",
            Self::PlainText => "plain_text",
            Self::OcrFallback => "ocr_fallback",
        }
    }
}

/// Output of the extraction stage. Produced once per case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub case: ContractCase,
    pub text: String,
    pub method: ExtractionMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_joins_container_and_key() {
        let doc = DocumentReference::new("artifacts", "acme/contract.pdf");
        assert_eq!(doc.uri(), "s3://artifacts/acme/contract.pdf");
    }

    #[test]
    fn extension_is_lowercased() {
        let doc = DocumentReference::new("b", "acme/Scan.JPEG");
        assert_eq!(doc.extension().as_deref(), Some("jpeg"));
    }

    #[test]
    fn extension_uses_final_segment_only() {
        let doc = DocumentReference::new("b", "acme.v2/contract");
        assert_eq!(doc.extension(), None);
    }

    #[test]
    fn dotfile_has_no_extension() {
        assert_eq!(DocumentReference::new("b", "acme/.pdf").extension(), None);
        assert_eq!(DocumentReference::new("b", "acme/file.").extension(), None);
    }

    #[test]
    fn open_keeps_supplied_id() {
        let case = ContractCase::open(
            Some("abc-123"),
            DocumentReference::new("b", "acme/contract.pdf"),
        );
        assert_eq!(case.case_id, "abc-123");
        assert_eq!(case.tenant_id.as_deref(), Some("acme"));
    }

    #[test]
    fn open_generates_id_when_missing_or_empty() {
        let doc = DocumentReference::new("b", "contract.txt");
        let a = ContractCase::open(None, doc.clone());
        let b = ContractCase::open(Some("  "), doc);
        assert!(Uuid::parse_str(&a.case_id).is_ok());
        assert!(Uuid::parse_str(&b.case_id).is_ok());
        assert_ne!(a.case_id, b.case_id);
    }

    #[test]
    fn method_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractionMethod::OcrAsync).unwrap();
        assert_eq!(json, "\"ocr_async\"");
    }
}
