//! Compliance and risk findings produced by the analysis stages.
//!
//! Both finding types read from an empty object: every field is optional on
//! the wire and absence is `None`, never a sentinel. A finding is produced
//! once per case per analyzer and replaced wholesale on retry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Which path produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    /// Values parsed from the inference service's output.
    Model,
    /// Deterministic keyword scoring.
    Heuristic,
    /// Inference failed; `raw_output` documents the failure.
    Degraded,
    /// No extracted text; inference was not attempted.
    NoInput,
}

impl FindingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Heuristic => "heuristic",
            Self::Degraded => "degraded",
            Self::NoInput => "no_input",
        }
    }
}

/// Regex and keyword hits from the compliance pre-pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicFindings {
    /// Match count per PII category (`ssn`, `email`, `phone`, `account_number`).
    pub pii: BTreeMap<String, usize>,
    pub financial_indicators: Vec<String>,
    pub data_protection_indicators: Vec<String>,
}

impl HeuristicFindings {
    pub fn pii_total(&self) -> usize {
        self.pii.values().sum()
    }
}

/// Per-clause explanation returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseAssessment {
    #[serde(deserialize_with = "lenient::string")]
    pub clause: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub framework: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub compliance_status: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub violated_requirement: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub reasoning: Option<String>,
    #[serde(deserialize_with = "lenient::f64")]
    pub score: Option<f64>,
}

/// Output of the compliance stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceFindings {
    #[serde(default, alias = "contract_id", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub compliance_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub overall_compliance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explainability: Vec<ClauseAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristics: Option<HeuristicFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FindingSource>,
    #[serde(default, alias = "model_response", skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Risk band for an overall risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low below 4, Medium from 4 up to (not including) 7, High from 7.
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Sub-scores (0-10) per risk category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBreakdown {
    #[serde(deserialize_with = "lenient::f64")]
    pub liability: Option<f64>,
    #[serde(deserialize_with = "lenient::f64")]
    pub indemnification: Option<f64>,
    #[serde(deserialize_with = "lenient::f64")]
    pub data_protection: Option<f64>,
    #[serde(deserialize_with = "lenient::f64")]
    pub termination: Option<f64>,
}

/// Output of the risk stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFindings {
    #[serde(default, alias = "contract_id", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub overall_risk_score: Option<f64>,
    #[serde(default, alias = "confidence_score", deserialize_with = "lenient::f64")]
    pub overall_confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_breakdown: Option<RiskBreakdown>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FindingSource>,
    #[serde(default, alias = "model_output_raw", skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl RiskFindings {
    /// True when the scores come from keyword scoring rather than the model.
    pub fn is_heuristic(&self) -> bool {
        self.source == Some(FindingSource::Heuristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_objects_deserialize() {
        let c: ComplianceFindings = serde_json::from_str("{}").unwrap();
        let r: RiskFindings = serde_json::from_str("{}").unwrap();
        assert_eq!(c, ComplianceFindings::default());
        assert_eq!(r, RiskFindings::default());
    }

    #[test]
    fn risk_accepts_confidence_score_alias() {
        let r: RiskFindings =
            serde_json::from_str(r#"{"overall_risk_score": "6.2", "confidence_score": 0.65}"#)
                .unwrap();
        assert_eq!(r.overall_risk_score, Some(6.2));
        assert_eq!(r.overall_confidence, Some(0.65));
    }

    #[test]
    fn non_numeric_scores_read_as_absent() {
        let c: ComplianceFindings = serde_json::from_str(
            r#"{"compliance_status": "FAIL", "overall_compliance_score": "n/a"}"#,
        )
        .unwrap();
        assert_eq!(c.compliance_status.as_deref(), Some("FAIL"));
        assert_eq!(c.overall_compliance_score, None);
    }

    #[test]
    fn risk_level_bands() {
        assert_eq!(RiskLevel::from_score(3.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(6.99), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(7.0), RiskLevel::High);
    }

    #[test]
    fn optional_fields_are_omitted_when_serialized() {
        let json = serde_json::to_value(RiskFindings {
            overall_risk_score: Some(8.0),
            source: Some(FindingSource::Heuristic),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json["overall_risk_score"], 8.0);
        assert_eq!(json["source"], "heuristic");
        assert!(json.get("top_risks").is_none());
        assert!(json.get("case_id").is_none());
    }
}
