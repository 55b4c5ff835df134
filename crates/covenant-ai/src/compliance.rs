use std::sync::Arc;

use covenant_core::{AnalyzerSettings, ClauseAssessment, ComplianceFindings, FindingSource};
use tracing::{info, warn};

use crate::parse::ParsedOutput;
use crate::{AnalysisInput, Inference, failure_document, prompt, rules};

const COMPLIANCE_FIELDS: &[&str] = &["compliance_status", "overall_compliance_score"];

/// Compliance analyzer: heuristic pre-pass plus one model call.
pub struct ComplianceAnalyzer {
    inference: Arc<dyn Inference>,
    settings: AnalyzerSettings,
}

impl ComplianceAnalyzer {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self::with_settings(inference, AnalyzerSettings::default())
    }

    pub fn with_settings(inference: Arc<dyn Inference>, settings: AnalyzerSettings) -> Self {
        Self {
            inference,
            settings,
        }
    }

    /// Produce a compliance finding. Never fails.
    pub async fn analyze(&self, input: &AnalysisInput<'_>) -> ComplianceFindings {
        let case_id = input.case_id.map(str::to_string);
        let heuristics = rules::scan_compliance(input.text);

        if input.is_empty() {
            warn!(case_id = ?input.case_id, "no extracted text, skipping inference");
            return ComplianceFindings {
                case_id,
                heuristics: Some(heuristics),
                source: Some(FindingSource::NoInput),
                ..Default::default()
            };
        }

        let prompt = prompt::compliance(input, &heuristics, self.settings.max_prompt_chars);
        let raw = match self.inference.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(case_id = ?input.case_id, error = %e, "compliance inference failed");
                return ComplianceFindings {
                    case_id,
                    heuristics: Some(heuristics),
                    source: Some(FindingSource::Degraded),
                    raw_output: Some(failure_document(&e, self.inference.model_id())),
                    ..Default::default()
                };
            }
        };

        let parsed = ParsedOutput::parse(&raw, COMPLIANCE_FIELDS);
        let findings = ComplianceFindings {
            case_id,
            compliance_status: parsed.string(&["compliance_status"]),
            overall_compliance_score: parsed.number(&["overall_compliance_score"]),
            explainability: explainability(&parsed),
            heuristics: Some(heuristics),
            source: Some(FindingSource::Model),
            raw_output: Some(raw),
        };
        info!(
            case_id = ?input.case_id,
            tier = parsed.tier(),
            status = ?findings.compliance_status,
            score = ?findings.overall_compliance_score,
            clauses = findings.explainability.len(),
            "compliance analyzed"
        );
        findings
    }
}

/// Per-clause entries; anything that is not a clause object is skipped.
fn explainability(parsed: &ParsedOutput) -> Vec<ClauseAssessment> {
    parsed
        .find("explainability")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockInference;
    use covenant_core::TenantProfile;

    fn input<'a>(text: &'a str, profile: &'a TenantProfile) -> AnalysisInput<'a> {
        AnalysisInput {
            text,
            case_id: Some("case-1"),
            document_uri: "s3://docs/acme/msa.txt",
            profile,
        }
    }

    #[tokio::test]
    async fn empty_text_skips_inference() {
        let mock = Arc::new(MockInference::replying("{}"));
        let analyzer = ComplianceAnalyzer::new(mock.clone());
        let profile = TenantProfile::default();

        let findings = analyzer.analyze(&input("", &profile)).await;

        assert_eq!(mock.call_count(), 0);
        assert_eq!(findings.source, Some(FindingSource::NoInput));
        assert_eq!(findings.case_id.as_deref(), Some("case-1"));
        assert_eq!(findings.heuristics.unwrap().pii_total(), 0);
        assert_eq!(findings.compliance_status, None);
    }

    #[tokio::test]
    async fn model_reply_with_nested_overall_compliance() {
        let reply = r#"Sure. {"summary": "ok", "overall_compliance": {"compliance_status": "FAIL", "overall_compliance_score": 3.5},
            "details": {"explainability": [
                {"clause": "Data Processing", "framework": "GDPR", "compliance_status": "Failed", "score": "2"},
                "not a clause"
            ]}}"#;
        let mock = Arc::new(MockInference::replying(reply));
        let analyzer = ComplianceAnalyzer::new(mock.clone());
        let profile = TenantProfile::default();

        let findings = analyzer
            .analyze(&input("The processor handles personal data.", &profile))
            .await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(findings.source, Some(FindingSource::Model));
        assert_eq!(findings.compliance_status.as_deref(), Some("FAIL"));
        assert_eq!(findings.overall_compliance_score, Some(3.5));
        assert_eq!(findings.explainability.len(), 1);
        assert_eq!(findings.explainability[0].score, Some(2.0));
        assert_eq!(findings.raw_output.as_deref(), Some(reply));
        let heuristics = findings.heuristics.unwrap();
        assert_eq!(
            heuristics.data_protection_indicators,
            vec!["personal data", "processor"]
        );
    }

    #[tokio::test]
    async fn prompt_includes_heuristics() {
        let mock = Arc::new(MockInference::replying("{}"));
        let analyzer = ComplianceAnalyzer::new(mock.clone());
        let profile = TenantProfile::default();

        analyzer
            .analyze(&input("Invoice payment due.", &profile))
            .await;

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(r#""financial_indicators":["invoice","payment"]"#));
    }

    #[tokio::test]
    async fn inference_failure_is_degraded() {
        let mock = Arc::new(MockInference::failing("throttled").with_model_id("nova-lite"));
        let analyzer = ComplianceAnalyzer::new(mock.clone());
        let profile = TenantProfile::default();

        let findings = analyzer.analyze(&input("Some contract.", &profile)).await;

        assert_eq!(findings.source, Some(FindingSource::Degraded));
        assert_eq!(findings.compliance_status, None);
        let doc: serde_json::Value =
            serde_json::from_str(findings.raw_output.as_deref().unwrap()).unwrap();
        assert_eq!(doc["summary"], "Inference invocation failed");
        assert_eq!(doc["model_id"], "nova-lite");
    }

    #[tokio::test]
    async fn unparseable_reply_leaves_fields_absent() {
        let mock = Arc::new(MockInference::replying("The contract looks fine to me."));
        let analyzer = ComplianceAnalyzer::new(mock);
        let profile = TenantProfile::default();

        let findings = analyzer.analyze(&input("Some contract.", &profile)).await;

        assert_eq!(findings.source, Some(FindingSource::Model));
        assert_eq!(findings.compliance_status, None);
        assert_eq!(findings.overall_compliance_score, None);
        assert!(findings.explainability.is_empty());
    }
}
