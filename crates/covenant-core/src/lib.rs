//! Core types for contract review: cases, findings, decisions, and the envelope passed between stages.

pub mod case;
pub mod decision;
pub mod envelope;
mod error;
pub mod findings;
pub mod lenient;
pub mod settings;
pub mod tenant;

pub use case::{ContractCase, DocumentReference, ExtractionMethod, ExtractionResult};
pub use decision::{Action, ComplianceStatus, Decision, DecisionInputs, Thresholds, decide};
pub use envelope::{CaseEnvelope, DocumentLocation};
pub use error::CoreError;
pub use findings::{
    ClauseAssessment, ComplianceFindings, FindingSource, HeuristicFindings, RiskBreakdown,
    RiskFindings, RiskLevel,
};
pub use settings::{AnalyzerSettings, ExtractorSettings};
pub use tenant::{TenantConfig, TenantProfile, TenantSource, resolve_tenant};
