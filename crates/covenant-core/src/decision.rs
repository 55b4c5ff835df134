//! Final routing decision from compliance and risk findings.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. risk score at or above the tenant's risk threshold → Legal Review
//! 2. compliance status normalizes to Non-Compliant → Escalate
//! 3. confidence below the tenant's confidence threshold → Human Review
//! 4. otherwise → Auto-Approve
//!
//! A missing number means its rule does not apply. Deciding never fails.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::findings::{ComplianceFindings, RiskFindings};
use crate::tenant::TenantProfile;

pub const DEFAULT_RISK_SCORE_THRESHOLD: f64 = 7.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Routing outcome for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "Legal Review")]
    LegalReview,
    #[serde(rename = "Escalate")]
    Escalate,
    #[serde(rename = "Human Review")]
    HumanReview,
    #[serde(rename = "Auto-Approve")]
    AutoApprove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LegalReview => "Legal Review",
            Self::Escalate => "Escalate",
            Self::HumanReview => "Human Review",
            Self::AutoApprove => "Auto-Approve",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance status after normalization.
///
/// Unrecognized strings are kept verbatim in [`Other`](Self::Other).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Partial,
    Other(String),
}

impl ComplianceStatus {
    /// Case- and punctuation-insensitive mapping of free-form status strings.
    pub fn normalize(raw: &str) -> Self {
        let folded: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "noncompliant" | "fail" | "failed" | "failures" | "failing" => Self::NonCompliant,
            "compliant" | "pass" | "passed" | "ok" | "success" => Self::Compliant,
            "partial" | "partiallycompliant" | "needsreview" => Self::Partial,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Compliant => "Compliant",
            Self::NonCompliant => "Non-Compliant",
            Self::Partial => "Partial",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ComplianceStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComplianceStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::normalize(&raw))
    }
}

/// Thresholds in force for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub risk_score_threshold: f64,
    pub confidence_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            risk_score_threshold: DEFAULT_RISK_SCORE_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Tenant values where configured, documented defaults otherwise.
    pub fn from_profile(profile: &TenantProfile) -> Self {
        let defaults = Self::default();
        Self {
            risk_score_threshold: profile
                .risk_score_threshold
                .unwrap_or(defaults.risk_score_threshold),
            confidence_threshold: profile
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
        }
    }
}

/// Upstream findings echoed on the decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInputs {
    pub compliance_findings: ComplianceFindings,
    pub risk_analysis_findings: RiskFindings,
}

/// Terminal artifact of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, alias = "contract_id")]
    pub case_id: Option<String>,
    pub decision: Action,
    pub reason: String,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default)]
    pub overall_compliance_score: Option<f64>,
    #[serde(default)]
    pub overall_risk_score: Option<f64>,
    #[serde(default)]
    pub overall_confidence: Option<f64>,
    #[serde(default)]
    pub inputs: DecisionInputs,
}

impl Decision {
    /// Stamp the case and tenant this decision belongs to.
    pub fn for_case(mut self, case_id: Option<String>, tenant_id: Option<String>) -> Self {
        if case_id.is_some() {
            self.case_id = case_id;
        }
        self.tenant_id = tenant_id;
        self
    }
}

/// Classify a case from its findings.
///
/// The case id is taken from whichever finding carries one; use
/// [`Decision::for_case`] to set it explicitly.
pub fn decide(
    compliance: &ComplianceFindings,
    risk: &RiskFindings,
    thresholds: &Thresholds,
) -> Decision {
    let status = compliance
        .compliance_status
        .as_deref()
        .map(ComplianceStatus::normalize);
    let risk_score = risk.overall_risk_score;
    let confidence = risk.overall_confidence;

    let (action, reason) = match (risk_score, &status, confidence) {
        (Some(score), _, _) if score >= thresholds.risk_score_threshold => (
            Action::LegalReview,
            format!(
                "overall_risk_score={score:?} >= {:?}",
                thresholds.risk_score_threshold
            ),
        ),
        (_, Some(ComplianceStatus::NonCompliant), _) => (
            Action::Escalate,
            "compliance_status=Non-Compliant".to_string(),
        ),
        (_, _, Some(conf)) if conf < thresholds.confidence_threshold => (
            Action::HumanReview,
            format!(
                "overall_confidence={conf:?} < {:?}",
                thresholds.confidence_threshold
            ),
        ),
        _ => (Action::AutoApprove, "Default approval".to_string()),
    };

    Decision {
        case_id: compliance.case_id.clone().or_else(|| risk.case_id.clone()),
        decision: action,
        reason,
        thresholds: *thresholds,
        tenant_id: None,
        compliance_status: status,
        overall_compliance_score: compliance.overall_compliance_score,
        overall_risk_score: risk_score,
        overall_confidence: confidence,
        inputs: DecisionInputs {
            compliance_findings: compliance.clone(),
            risk_analysis_findings: risk.clone(),
        },
    }
}
