//! Deterministic keyword and pattern scoring.
//!
//! The compliance pre-pass always runs and travels with the finding. The risk
//! scorer is the fallback when the model yields nothing usable.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use covenant_core::{FindingSource, HeuristicFindings, RiskBreakdown, RiskFindings, RiskLevel};
use regex::Regex;
use tracing::debug;

static PII_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("ssn", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid ssn pattern")),
        (
            "email",
            Regex::new(r"[a-zA-Z0-9.+_-]+@[a-zA-Z0-9._-]+\.[a-zA-Z]+").expect("valid email pattern"),
        ),
        ("phone", Regex::new(r"\b\+?\d[\d\-() ]{7,}\b").expect("valid phone pattern")),
        (
            "account_number",
            Regex::new(r"(?i)\baccount\s*(number|no)[:#\s]*\d{4,}\b")
                .expect("valid account number pattern"),
        ),
    ]
});

pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "invoice",
    "payment",
    "amount",
    "salary",
    "compensation",
    "financial statement",
    "balance sheet",
    "tax",
    "audit",
    "revenue",
    "expense",
];

pub const DATA_PROTECTION_KEYWORDS: &[&str] = &[
    "personal data",
    "data subject",
    "consent",
    "processing",
    "controller",
    "processor",
    "data protection",
];

/// PII match counts and keyword hits for the compliance prompt.
pub fn scan_compliance(text: &str) -> HeuristicFindings {
    let pii: BTreeMap<String, usize> = PII_PATTERNS
        .iter()
        .map(|(name, re)| (name.to_string(), re.find_iter(text).count()))
        .collect();

    let lowered = text.to_lowercase();
    let hits = |keywords: &[&str]| -> Vec<String> {
        keywords
            .iter()
            .filter(|kw| lowered.contains(*kw))
            .map(|kw| kw.to_string())
            .collect()
    };

    let findings = HeuristicFindings {
        pii,
        financial_indicators: hits(FINANCIAL_KEYWORDS),
        data_protection_indicators: hits(DATA_PROTECTION_KEYWORDS),
    };
    debug!(
        pii = findings.pii_total(),
        financial = findings.financial_indicators.len(),
        data_protection = findings.data_protection_indicators.len(),
        "compliance heuristics"
    );
    findings
}

/// Keyword risk scoring used when the model gives no risk score.
///
/// Scores are fixed per category; the overall score is their mean rounded to
/// two decimals. Confidence is always 0.5.
pub fn score_risk(text: &str) -> RiskFindings {
    let lower = text.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    let liability = if has("unlimited liability") || (has("liability") && !has("cap")) {
        8.0
    } else {
        0.0
    };
    let indemnification = if has("indemnif") { 6.0 } else { 0.0 };
    let data_protection = if has("data breach") || has("personal data") || has("gdpr") {
        7.0
    } else {
        0.0
    };
    let termination = if has("termination") || has("terminate") {
        4.0
    } else {
        0.0
    };

    let mean: f64 = (liability + indemnification + data_protection + termination) / 4.0;
    let overall = (mean * 100.0).round() / 100.0;

    let mut top_risks = Vec::new();
    if liability >= 7.0 {
        top_risks.push("Unlimited liability clause".to_string());
    }
    if data_protection >= 6.0 {
        top_risks.push("No explicit data breach notification timeline".to_string());
    }

    RiskFindings {
        overall_risk_score: Some(overall),
        overall_confidence: Some(0.5),
        risk_level: Some(RiskLevel::from_score(overall).as_str().to_string()),
        risk_breakdown: Some(RiskBreakdown {
            liability: Some(liability),
            indemnification: Some(indemnification),
            data_protection: Some(data_protection),
            termination: Some(termination),
        }),
        top_risks,
        source: Some(FindingSource::Heuristic),
        ..Default::default()
    }
}
