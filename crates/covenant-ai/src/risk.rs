use std::sync::Arc;

use covenant_core::{AnalyzerSettings, FindingSource, RiskBreakdown, RiskFindings, lenient};
use tracing::{info, warn};

use crate::parse::ParsedOutput;
use crate::{AnalysisInput, Inference, failure_document, prompt, rules};

const RISK_FIELDS: &[&str] = &[
    "overall_risk_score",
    "overall_confidence",
    "confidence_score",
    "risk_level",
];

/// Risk analyzer: one model call, keyword scoring when the model gives no score.
pub struct RiskAnalyzer {
    inference: Arc<dyn Inference>,
    settings: AnalyzerSettings,
}

impl RiskAnalyzer {
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self::with_settings(inference, AnalyzerSettings::default())
    }

    pub fn with_settings(inference: Arc<dyn Inference>, settings: AnalyzerSettings) -> Self {
        Self {
            inference,
            settings,
        }
    }

    /// Produce a risk finding. Never fails.
    ///
    /// Without text there is nothing to score: the finding carries no
    /// numbers and the decision rules skip it.
    pub async fn analyze(&self, input: &AnalysisInput<'_>) -> RiskFindings {
        let case_id = input.case_id.map(str::to_string);

        if input.is_empty() {
            warn!(case_id = ?input.case_id, "no extracted text, skipping risk analysis");
            return RiskFindings {
                case_id,
                source: Some(FindingSource::NoInput),
                ..Default::default()
            };
        }

        let prompt = prompt::risk(input, self.settings.max_prompt_chars);
        let (raw, parsed) = match self.inference.generate(&prompt).await {
            Ok(raw) => {
                let parsed = ParsedOutput::parse(&raw, RISK_FIELDS);
                (raw, Some(parsed))
            }
            Err(e) => {
                warn!(case_id = ?input.case_id, error = %e, "risk inference failed");
                (failure_document(&e, self.inference.model_id()), None)
            }
        };

        let from_model = parsed
            .as_ref()
            .and_then(|p| p.number(&["overall_risk_score"]).map(|score| (p, score)));

        let findings = match from_model {
            Some((parsed, score)) => RiskFindings {
                case_id,
                overall_risk_score: Some(score),
                overall_confidence: overall_confidence(parsed),
                risk_level: parsed.string(&["risk_level"]),
                risk_breakdown: parsed
                    .find("risk_breakdown")
                    .and_then(|v| serde_json::from_value::<RiskBreakdown>(v.clone()).ok()),
                top_risks: top_risks(parsed),
                source: Some(FindingSource::Model),
                raw_output: Some(raw),
            },
            None => {
                warn!(
                    case_id = ?input.case_id,
                    tier = parsed.as_ref().map(ParsedOutput::tier),
                    "no risk score from model, using keyword scoring"
                );
                RiskFindings {
                    case_id,
                    raw_output: Some(raw),
                    ..rules::score_risk(input.text)
                }
            }
        };

        info!(
            case_id = ?input.case_id,
            source = findings.source.map(|s| s.as_str()),
            score = ?findings.overall_risk_score,
            confidence = ?findings.overall_confidence,
            "risk analyzed"
        );
        findings
    }
}

/// Confidence is read beside the overall score only, never from nested
/// per-clause entries.
fn overall_confidence(parsed: &ParsedOutput) -> Option<f64> {
    let holder = parsed.holder("overall_risk_score")?;
    ["overall_confidence", "confidence_score"]
        .iter()
        .find_map(|key| holder.get(*key).and_then(lenient::as_f64))
}

fn top_risks(parsed: &ParsedOutput) -> Vec<String> {
    parsed
        .find("top_risks")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
