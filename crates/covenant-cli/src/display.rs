//! Vertical card summary of a case.
//!
//! Written to stderr so stdout carries only the JSON envelope. Sections with
//! nothing to show are left out.

use covenant_core::CaseEnvelope;

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print the case card to stderr.
pub fn print_case_card(envelope: &CaseEnvelope) {
    for line in case_card(envelope) {
        eprintln!("{line}");
    }
}

/// Card lines for a case, grouped by pipeline stage.
pub fn case_card(envelope: &CaseEnvelope) -> Vec<String> {
    let mut lines = vec![
        format!("=== {} ===", envelope.case_id().unwrap_or("(no case id)")),
        envelope.document_uri(),
        String::new(),
    ];

    section(
        &mut lines,
        "Extraction",
        &[
            ("method", envelope.extraction_method.map(|m| m.as_str().to_string())),
            (
                "characters",
                envelope
                    .extracted_text
                    .as_ref()
                    .map(|t| t.chars().count().to_string()),
            ),
        ],
    );

    if let Some(c) = &envelope.compliance_findings {
        let heuristics = c.heuristics.as_ref();
        section(
            &mut lines,
            "Compliance",
            &[
                ("status", c.compliance_status.clone()),
                ("score", c.overall_compliance_score.map(|s| s.to_string())),
                ("source", c.source.map(|s| s.as_str().to_string())),
                ("pii matches", heuristics.map(|h| h.pii_total().to_string())),
                (
                    "financial indicators",
                    heuristics.and_then(|h| list(&h.financial_indicators)),
                ),
                (
                    "data protection",
                    heuristics.and_then(|h| list(&h.data_protection_indicators)),
                ),
                (
                    "clauses",
                    (!c.explainability.is_empty()).then(|| c.explainability.len().to_string()),
                ),
            ],
        );
    }

    if let Some(r) = &envelope.risk_analysis_findings {
        section(
            &mut lines,
            "Risk",
            &[
                ("score", r.overall_risk_score.map(|s| s.to_string())),
                ("level", r.risk_level.clone()),
                ("confidence", r.overall_confidence.map(|c| c.to_string())),
                ("source", r.source.map(|s| s.as_str().to_string())),
                ("top risks", list(&r.top_risks)),
            ],
        );
    }

    if let Some(d) = &envelope.decision {
        section(
            &mut lines,
            "Decision",
            &[
                ("decision", Some(d.decision.to_string())),
                ("reason", Some(d.reason.clone())),
                ("tenant", d.tenant_id.clone()),
                (
                    "thresholds",
                    Some(format!(
                        "risk >= {}, confidence < {}",
                        d.thresholds.risk_score_threshold, d.thresholds.confidence_threshold
                    )),
                ),
            ],
        );
    }

    lines
}

// ── Section rendering ──

fn section(lines: &mut Vec<String>, header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, value)| value.is_none()) {
        return;
    }
    lines.push(header.to_string());
    for (label, value) in rows {
        if let Some(value) = value {
            lines.push(format!("  {label:<26} {value}"));
        }
    }
    lines.push(String::new());
}

fn list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut shown = items
        .iter()
        .take(MAX_LIST_ITEMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > MAX_LIST_ITEMS {
        shown.push_str(&format!(" (+{} more)", items.len() - MAX_LIST_ITEMS));
    }
    Some(shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decided_case_card() {
        let envelope = CaseEnvelope::from_json(
            r#"{
                "case_id": "case-1",
                "document": {"container": "docs", "key": "acme/msa.pdf"},
                "risk_analysis_findings": {"overall_risk_score": 8, "top_risks": ["Uncapped liability"]},
                "decision": {"case_id": "case-1", "decision": "Legal Review",
                             "reason": "overall_risk_score=8.0 >= 7.0",
                             "thresholds": {"risk_score_threshold": 7, "confidence_threshold": 0.7}}
            }"#,
        )
        .unwrap();

        let card = case_card(&envelope);

        assert_eq!(card[0], "=== case-1 ===");
        assert_eq!(card[1], "s3://docs/acme/msa.pdf");
        assert!(card.contains(&"Risk".to_string()));
        assert!(!card.contains(&"Compliance".to_string()));
        assert!(!card.contains(&"Extraction".to_string()));
        assert!(card.iter().any(|l| l.trim_start().starts_with("decision") && l.ends_with("Legal Review")));
        assert!(card.iter().any(|l| l.ends_with("Uncapped liability")));
    }

    #[test]
    fn long_lists_are_capped() {
        let items: Vec<String> = (0..12).map(|i| format!("risk {i}")).collect();
        let shown = list(&items).unwrap();
        assert!(shown.starts_with("risk 0, risk 1"));
        assert!(shown.ends_with("risk 9 (+2 more)"));
    }
}
