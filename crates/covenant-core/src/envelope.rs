//! The interchange document passed between pipeline stages.
//!
//! Each stage reads the subset of fields it needs and returns a copy of the
//! envelope with its own output filled in. Every field is optional on the
//! wire; field names from the older storage-triggered payloads
//! (`contract_id`, `s3`, `s3_uri`, `bucket`) are accepted as aliases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::case::{DocumentReference, ExtractionMethod};
use crate::decision::Decision;
use crate::error::CoreError;
use crate::findings::{ComplianceFindings, RiskFindings};
use crate::tenant::resolve_tenant;

/// Document location as it appears on the wire; either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    #[serde(default, alias = "bucket")]
    pub container: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl DocumentLocation {
    /// A complete reference, if both container and key are non-empty.
    pub fn to_reference(&self) -> Option<DocumentReference> {
        let container = self.container.as_deref().filter(|c| !c.trim().is_empty())?;
        let key = self.key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some(DocumentReference::new(container, key))
    }
}

impl From<&DocumentReference> for DocumentLocation {
    fn from(doc: &DocumentReference) -> Self {
        Self {
            container: Some(doc.container.clone()),
            key: Some(doc.key.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseEnvelope {
    #[serde(default, alias = "contract_id")]
    pub case_id: Option<String>,
    #[serde(default, alias = "s3", skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentLocation>,
    #[serde(default, alias = "s3_uri", skip_serializing_if = "Option::is_none")]
    pub document_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    /// Status set directly by the orchestrator; takes precedence over the findings' own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_findings: Option<ComplianceFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_analysis_findings: Option<RiskFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl CaseEnvelope {
    /// Entry envelope for a stored document, before a case id exists.
    pub fn for_document(document: &DocumentReference) -> Self {
        Self {
            case_id: None,
            document: Some(document.into()),
            document_uri: Some(document.uri()),
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Non-empty case id, if one has been assigned.
    pub fn case_id(&self) -> Option<&str> {
        self.case_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn document_ref(&self) -> Option<DocumentReference> {
        self.document.as_ref().and_then(DocumentLocation::to_reference)
    }

    /// Explicit URI, else one derived from whatever location parts are present.
    pub fn document_uri(&self) -> String {
        if let Some(uri) = self.document_uri.as_deref().filter(|u| !u.is_empty()) {
            return uri.to_string();
        }
        let location = self.document.clone().unwrap_or_default();
        format!(
            "s3://{}/{}",
            location.container.unwrap_or_default(),
            location.key.unwrap_or_default()
        )
    }

    /// Tenant derived from the document key.
    pub fn tenant_id(&self) -> Option<String> {
        resolve_tenant(self.document.as_ref().and_then(|d| d.key.as_deref()))
    }

    /// Extracted text, empty when absent.
    pub fn text(&self) -> &str {
        self.extracted_text.as_deref().unwrap_or_default()
    }

    /// Build entry envelopes from an object-created storage notification.
    ///
    /// Expects `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`.
    /// Keys are URL-decoded with `+` read as a space; invalid UTF-8 is replaced
    /// rather than rejected. Records without a bucket or key are skipped.
    pub fn from_storage_event(event: &Value) -> Result<Vec<Self>, CoreError> {
        let records = match event.get("Records") {
            Some(Value::Array(records)) => records,
            Some(_) => return Err(CoreError::InvalidEvent("Records is not an array".into())),
            None => return Ok(Vec::new()),
        };

        let mut envelopes = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let s3 = &record["s3"];
            let bucket = s3["bucket"]["name"].as_str().filter(|b| !b.is_empty());
            let key = s3["object"]["key"].as_str().filter(|k| !k.is_empty());
            let (Some(bucket), Some(key)) = (bucket, key) else {
                warn!(record = i, "storage event record without bucket or key; skipping");
                continue;
            };

            let key = decode_object_key(key);
            let doc = DocumentReference::new(bucket, key);
            debug!(uri = %doc.uri(), "built entry envelope from storage event");
            envelopes.push(Self::for_document(&doc));
        }
        Ok(envelopes)
    }
}

/// Percent-decode a notification key. Byte sequences that are not UTF-8
/// become U+FFFD so one bad key never fails the event.
fn decode_object_key(key: &str) -> String {
    let spaced = key.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_legacy_field_names() {
        let env = CaseEnvelope::from_json(
            r#"{
                "contract_id": "abc-123",
                "s3": {"bucket": "example-bucket", "key": "acme/contract.pdf"},
                "s3_uri": "s3://example-bucket/acme/contract.pdf"
            }"#,
        )
        .unwrap();
        assert_eq!(env.case_id(), Some("abc-123"));
        assert_eq!(
            env.document_ref(),
            Some(DocumentReference::new("example-bucket", "acme/contract.pdf"))
        );
        assert_eq!(env.tenant_id().as_deref(), Some("acme"));
    }

    #[test]
    fn empty_case_id_counts_as_absent() {
        let env = CaseEnvelope::from_json(r#"{"case_id": ""}"#).unwrap();
        assert_eq!(env.case_id(), None);
    }

    #[test]
    fn incomplete_location_has_no_reference() {
        let env = CaseEnvelope::from_json(r#"{"document": {"container": "b"}}"#).unwrap();
        assert_eq!(env.document_ref(), None);
        assert_eq!(env.document_uri(), "s3://b/");
    }

    #[test]
    fn serializes_without_absent_stage_outputs() {
        let doc = DocumentReference::new("b", "acme/x.pdf");
        let json = serde_json::to_value(CaseEnvelope::for_document(&doc)).unwrap();
        assert_eq!(json["document"]["container"], "b");
        assert_eq!(json["document_uri"], "s3://b/acme/x.pdf");
        assert!(json.get("extracted_text").is_none());
        assert!(json.get("decision").is_none());
    }

    #[test]
    fn empty_findings_objects_parse() {
        let env = CaseEnvelope::from_json(
            r#"{"compliance_findings": {}, "risk_analysis_findings": {}}"#,
        )
        .unwrap();
        assert_eq!(env.compliance_findings, Some(ComplianceFindings::default()));
        assert_eq!(env.risk_analysis_findings, Some(RiskFindings::default()));
    }

    #[test]
    fn storage_event_yields_entry_envelopes() {
        let event = json!({
            "Records": [
                {"s3": {"bucket": {"name": "artifacts"}, "object": {"key": "acme/Master+Agreement%282026%29.pdf"}}},
                {"s3": {"bucket": {"name": "artifacts"}, "object": {}}}
            ]
        });
        let envs = CaseEnvelope::from_storage_event(&event).unwrap();
        assert_eq!(envs.len(), 1);
        let doc = envs[0].document_ref().unwrap();
        assert_eq!(doc.key, "acme/Master Agreement(2026).pdf");
        assert_eq!(envs[0].case_id(), None);
        assert_eq!(
            envs[0].document_uri.as_deref(),
            Some("s3://artifacts/acme/Master Agreement(2026).pdf")
        );
    }

    #[test]
    fn undecodable_key_does_not_drop_its_neighbours() {
        let event = json!({
            "Records": [
                {"s3": {"bucket": {"name": "artifacts"}, "object": {"key": "acme/good.pdf"}}},
                {"s3": {"bucket": {"name": "artifacts"}, "object": {"key": "acme/bad%FF.pdf"}}}
            ]
        });
        let envs = CaseEnvelope::from_storage_event(&event).unwrap();
        assert_eq!(envs.len(), 2);
        assert_eq!(envs[0].document_ref().unwrap().key, "acme/good.pdf");
        assert_eq!(envs[1].document_ref().unwrap().key, "acme/bad\u{FFFD}.pdf");
    }

    #[test]
    fn storage_event_without_records_is_empty() {
        assert!(CaseEnvelope::from_storage_event(&json!({})).unwrap().is_empty());
        assert!(CaseEnvelope::from_storage_event(&json!({"Records": 3})).is_err());
    }
}
