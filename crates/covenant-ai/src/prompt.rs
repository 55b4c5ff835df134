use covenant_core::HeuristicFindings;

use crate::AnalysisInput;

// ── Prompt templates ──

const COMPLIANCE_INSTRUCTIONS: &str = "\
You are a compliance assistant. Compliance checks differ by region and industry: \
apply the data privacy regime that fits (GDPR for the EU, CCPA for the US, HIPAA for \
healthcare) and the relevant security and financial controls (SOC 2, ISO 27001, SOX).

Review the contract text below. Respond ONLY with a JSON object, no markdown fences:
{
  \"summary\": \"concise human-readable summary of compliance issues\",
  \"severity\": \"low|medium|high\",
  \"recommendations\": [\"remediation step\", ...],
  \"overall_compliance\": {
    \"compliance_status\": \"PASS|PARTIAL|FAIL\",
    \"overall_compliance_score\": <number 0-10 derived from the clause scores>
  },
  \"details\": {
    \"explainability\": [
      {
        \"clause\": \"Data Processing\",
        \"framework\": \"GDPR|SOX|...\",
        \"compliance_status\": \"Passed|Failed|NeedsReview\",
        \"violated_requirement\": \"string\",
        \"reasoning\": \"string\",
        \"score\": <0-10>
      }
    ]
  }
}";

const RISK_INSTRUCTIONS: &str = "\
You are a legal assistant that scores contract risk. Respond ONLY with a JSON object, \
no markdown fences, following this schema exactly:
{
  \"risk_breakdown\": { \"liability\": <0-10>, \"indemnification\": <0-10>, \"data_protection\": <0-10>, \"termination\": <0-10> },
  \"overall_risk_score\": <number 0-10>,
  \"risk_level\": \"Low|Medium|High\",
  \"confidence_score\": <0.0-1.0>,
  \"top_risks\": [\"string\", ...],
  \"clauses\": [
    { \"clause_name\": \"string\", \"risk_score\": <1-10>, \"reasoning\": \"2-3 sentences\", \"clause_text\": \"exact clause language\", \"confidence_score\": <0.0-1.0> }
  ]
}
Breakdown scores are integers; the overall score may be decimal. Score categories that \
are absent from the text conservatively.";

/// Cut `text` to at most `max_chars` characters. Returns the sample and
/// whether anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

fn context_block(input: &AnalysisInput<'_>) -> String {
    format!(
        "Region: {region}\n\
         Industry: {industry}\n\
         Case ID: {case_id}\n\
         Document: {uri}",
        region = input.profile.region.as_deref().unwrap_or("unknown"),
        industry = input.profile.industry.as_deref().unwrap_or("unknown"),
        case_id = input.case_id.unwrap_or("unknown"),
        uri = input.document_uri,
    )
}

pub(crate) fn compliance(
    input: &AnalysisInput<'_>,
    heuristics: &HeuristicFindings,
    max_chars: usize,
) -> String {
    let (sample, truncated) = truncate_chars(input.text, max_chars);
    let heuristics = serde_json::to_string(heuristics).unwrap_or_else(|_| "{}".into());
    format!(
        "{COMPLIANCE_INSTRUCTIONS}\n\n\
         {context}\n\
         Heuristic findings (PII counts, financial indicators, data protection keywords): {heuristics}\n\
         \n\
         Contract text (truncated={truncated}):\n\
         {sample}",
        context = context_block(input),
    )
}

pub(crate) fn risk(input: &AnalysisInput<'_>, max_chars: usize) -> String {
    let (sample, truncated) = truncate_chars(input.text, max_chars);
    format!(
        "{RISK_INSTRUCTIONS}\n\n\
         {context}\n\
         \n\
         Contract text (truncated={truncated}):\n\
         {sample}",
        context = context_block(input),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::TenantProfile;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("abcdef", 4), ("abcd", true));
        assert_eq!(truncate_chars("abc", 4), ("abc", false));
        assert_eq!(truncate_chars("abcd", 4), ("abcd", false));
        assert_eq!(truncate_chars("ééé", 2), ("éé", true));
    }

    #[test]
    fn prompt_carries_context_and_flag() {
        let profile = TenantProfile {
            region: Some("EU".into()),
            ..Default::default()
        };
        let text = "x".repeat(20);
        let input = AnalysisInput {
            text: &text,
            case_id: Some("case-9"),
            document_uri: "s3://docs/acme/msa.pdf",
            profile: &profile,
        };
        let prompt = compliance(&input, &HeuristicFindings::default(), 10);
        assert!(prompt.contains("Region: EU"));
        assert!(prompt.contains("Industry: unknown"));
        assert!(prompt.contains("Case ID: case-9"));
        assert!(prompt.contains("s3://docs/acme/msa.pdf"));
        assert!(prompt.contains("truncated=true"));
        assert!(prompt.ends_with(&"x".repeat(10)));
        assert!(!prompt.contains(&"x".repeat(11)));
    }
}
