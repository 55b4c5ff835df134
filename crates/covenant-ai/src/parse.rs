//! Tolerant parsing of model output.
//!
//! Replies are tried against three tiers in order and the first that yields
//! anything wins; later tiers are never consulted to "correct" an earlier one.
//!
//! 1. [`strict_json`]: the whole reply is a JSON object.
//! 2. [`balanced_object`]: the first brace-balanced object embedded in prose
//!    or a code fence.
//! 3. [`regex_fields`]: `name: value` pairs for a fixed list of field names.
//!
//! If every tier fails the result is [`ParsedOutput::Unparsed`] and every
//! lookup returns `None`.

use std::collections::{HashMap, VecDeque};
use std::sync::{LazyLock, Mutex};

use covenant_core::lenient;
use regex::Regex;
use serde_json::{Map, Value};

/// Compiled `name: value` patterns, keyed by field name.
static FIELD_PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Outcome of the tiered parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    Strict(Value),
    Embedded(Value),
    Fields(Map<String, Value>),
    Unparsed,
}

impl ParsedOutput {
    /// Run the tiers over `text`. `field_names` feeds the regex tier only.
    pub fn parse(text: &str, field_names: &[&str]) -> Self {
        if let Some(value) = strict_json(text) {
            return Self::Strict(value);
        }
        if let Some(value) = balanced_object(text) {
            return Self::Embedded(value);
        }
        let fields = regex_fields(text, field_names);
        if fields.is_empty() {
            Self::Unparsed
        } else {
            Self::Fields(fields)
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            Self::Strict(_) => "strict",
            Self::Embedded(_) => "embedded",
            Self::Fields(_) => "fields",
            Self::Unparsed => "unparsed",
        }
    }

    pub fn is_parsed(&self) -> bool {
        !matches!(self, Self::Unparsed)
    }

    /// Value for `key`. In JSON tiers the shallowest occurrence wins.
    pub fn find(&self, key: &str) -> Option<&Value> {
        self.holder(key).and_then(|map| map.get(key))
    }

    /// The object that [`find`](Self::find) reads `key` from: the shallowest
    /// object holding it, or the whole field map in the regex tier.
    pub fn holder(&self, key: &str) -> Option<&Map<String, Value>> {
        match self {
            Self::Strict(value) | Self::Embedded(value) => shallowest_holder(value, key),
            Self::Fields(fields) => fields.contains_key(key).then_some(fields),
            Self::Unparsed => None,
        }
    }

    /// First of `keys` that holds a number or numeric string.
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .find_map(|key| self.find(key).and_then(lenient::as_f64))
    }

    /// First of `keys` that holds a non-blank string.
    pub fn string(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.find(key).and_then(lenient::as_str))
            .map(str::to_string)
    }
}

/// Tier 1: the trimmed text parses as a JSON object.
pub fn strict_json(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Tier 2: the first `{...}` span, balanced outside string literals, that
/// parses as a JSON object.
pub fn balanced_object(text: &str) -> Option<Value> {
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = closing_brace(&text[start..]) {
            if let Ok(value @ Value::Object(_)) =
                serde_json::from_str::<Value>(&text[start..=start + end])
            {
                return Some(value);
            }
        }
        from = start + 1;
    }
    None
}

/// Byte offset of the brace closing the `{` that starts `text`.
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tier 3: `name: value` or `name = value` for each of `names`.
///
/// Values may be quoted strings, numbers, or bare words (`risk_level: High`).
/// Only the first occurrence of each name is taken.
pub fn regex_fields(text: &str, names: &[&str]) -> Map<String, Value> {
    let mut fields = Map::new();
    for name in names {
        let Some(re) = field_pattern(name) else {
            continue;
        };
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let value = if let Some(s) = caps.get(1) {
            Value::String(s.as_str().to_string())
        } else if let Some(n) = caps.get(2) {
            n.as_str().parse::<f64>().map(Value::from).unwrap_or(Value::Null)
        } else if let Some(word) = caps.get(3) {
            Value::String(word.as_str().to_string())
        } else {
            continue;
        };
        fields.insert((*name).to_string(), value);
    }
    fields
}

fn field_pattern(name: &str) -> Option<Regex> {
    let mut cache = FIELD_PATTERNS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(re) = cache.get(name) {
        return Some(re.clone());
    }
    let pattern = format!(
        r#"["']?\b{}\b["']?\s*[:=]\s*(?:"([^"]*)"|(-?\d+(?:\.\d+)?)|([A-Za-z][A-Za-z_-]*))"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    cache.insert(name.to_string(), re.clone());
    Some(re)
}

fn shallowest_holder<'a>(root: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    let mut queue = VecDeque::from([root]);
    while let Some(value) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                if map.contains_key(key) {
                    return Some(map);
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RISK_FIELDS: &[&str] = &["overall_risk_score", "confidence_score", "risk_level"];

    #[test]
    fn strict_tier_takes_whole_object() {
        let parsed = ParsedOutput::parse(r#" {"overall_risk_score": 6.2} "#, RISK_FIELDS);
        assert_eq!(parsed.tier(), "strict");
        assert_eq!(parsed.number(&["overall_risk_score"]), Some(6.2));
    }

    #[test]
    fn strict_tier_rejects_non_objects() {
        assert_eq!(strict_json("[1, 2]"), None);
        assert_eq!(strict_json("\"text\""), None);
    }

    #[test]
    fn embedded_object_in_code_fence() {
        let reply = "Here is the analysis:\n```json\n{\"risk_level\": \"High\", \"note\": \"a } inside\"}\n```";
        let parsed = ParsedOutput::parse(reply, RISK_FIELDS);
        assert_eq!(parsed.tier(), "embedded");
        assert_eq!(parsed.string(&["risk_level"]).as_deref(), Some("High"));
        assert_eq!(parsed.find("note"), Some(&json!("a } inside")));
    }

    #[test]
    fn escaped_quotes_do_not_end_strings() {
        let reply = r#"result: {"summary": "the \"cap\" is {missing}", "overall_risk_score": 8}"#;
        let value = balanced_object(reply).unwrap();
        assert_eq!(value["overall_risk_score"], 8);
    }

    #[test]
    fn skips_unparseable_spans() {
        let reply = r#"{not json {"overall_risk_score": 2}}"#;
        let value = balanced_object(reply).unwrap();
        assert_eq!(value, json!({"overall_risk_score": 2}));
    }

    #[test]
    fn regex_tier_reads_loose_pairs() {
        let reply = r#"overall_risk_score: 7.5, risk_level = High, "confidence_score": "0.8""#;
        let parsed = ParsedOutput::parse(reply, RISK_FIELDS);
        assert_eq!(parsed.tier(), "fields");
        assert_eq!(parsed.number(&["overall_risk_score"]), Some(7.5));
        assert_eq!(parsed.string(&["risk_level"]).as_deref(), Some("High"));
        assert_eq!(parsed.number(&["overall_confidence", "confidence_score"]), Some(0.8));
    }

    #[test]
    fn first_successful_tier_wins() {
        let reply = r#"{"overall_risk_score": 3} but later overall_risk_score: 9"#;
        let parsed = ParsedOutput::parse(reply, RISK_FIELDS);
        assert_eq!(parsed.number(&["overall_risk_score"]), Some(3.0));
    }

    #[test]
    fn nothing_recognisable_is_unparsed() {
        let parsed = ParsedOutput::parse("I cannot help with that.", RISK_FIELDS);
        assert_eq!(parsed, ParsedOutput::Unparsed);
        assert!(!parsed.is_parsed());
        assert_eq!(parsed.number(&["overall_risk_score"]), None);
    }

    #[test]
    fn shallowest_occurrence_wins() {
        let reply = json!({
            "details": {"explainability": [{"compliance_status": "Passed"}]},
            "overall_compliance": {"compliance_status": "FAIL", "overall_compliance_score": "4"}
        })
        .to_string();
        let parsed = ParsedOutput::parse(&reply, &[]);
        assert_eq!(parsed.string(&["compliance_status"]).as_deref(), Some("FAIL"));
        assert_eq!(parsed.number(&["overall_compliance_score"]), Some(4.0));
    }

    #[test]
    fn holder_is_the_object_with_the_key() {
        let reply = json!({"assessment": {"overall_risk_score": 6, "confidence_score": 0.4}}).to_string();
        let parsed = ParsedOutput::parse(&reply, RISK_FIELDS);
        let holder = parsed.holder("overall_risk_score").unwrap();
        assert_eq!(holder.get("confidence_score"), Some(&json!(0.4)));
        assert!(parsed.holder("missing").is_none());
    }

    #[test]
    fn field_patterns_are_reused_across_parses() {
        for _ in 0..3 {
            let fields = regex_fields("risk_level: Low", &["risk_level"]);
            assert_eq!(fields.get("risk_level"), Some(&json!("Low")));
        }
        let cache = FIELD_PATTERNS.lock().unwrap();
        assert!(cache.contains_key("risk_level"));
    }

    #[test]
    fn field_names_match_whole_words() {
        let fields = regex_fields("overall_compliance_status: FAIL", &["compliance_status"]);
        assert!(fields.is_empty());
    }
}
