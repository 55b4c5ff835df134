//! Signal analysis: compliance and risk findings from extracted contract text.
//!
//! Both analyzers follow the same shape: a deterministic keyword/regex pass,
//! one call to the inference capability, and a tolerant parse of whatever the
//! model returned. Inference failures never escape an analyzer; they turn into
//! degraded or heuristic findings.

mod compliance;
mod error;
mod inference;
pub mod parse;
mod prompt;
mod risk;
pub mod rules;
pub mod testing;

#[cfg(feature = "http")]
pub mod http;

use covenant_core::TenantProfile;

pub use compliance::ComplianceAnalyzer;
pub use error::InferenceError;
pub use inference::{Inference, failure_document};
pub use parse::ParsedOutput;
pub use prompt::truncate_chars;
pub use risk::RiskAnalyzer;

#[cfg(feature = "http")]
pub use http::HttpInference;

/// What an analyzer needs to know about one case.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub text: &'a str,
    pub case_id: Option<&'a str>,
    pub document_uri: &'a str,
    pub profile: &'a TenantProfile,
}

impl AnalysisInput<'_> {
    /// No extracted text to analyze.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
