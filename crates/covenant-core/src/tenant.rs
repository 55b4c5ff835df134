//! Tenant resolution from storage keys and per-tenant configuration lookup.
//!
//! The tenant is the first path segment of a document's storage key
//! (`acme/contracts/msa.pdf` belongs to `acme`). Configuration is a JSON object
//! keyed by tenant id with an optional `"default"` entry:
//!
//! ```json
//! {
//!   "default": { "region": "US", "risk_score_threshold": 7.0 },
//!   "acme":    { "region": "EU", "industry": "healthcare", "confidence_threshold": 0.8 }
//! }
//! ```
//!
//! Lookups never fail. Missing tenants fall back to `"default"`, then to an
//! empty profile; numeric defaults are applied by [`Thresholds`](crate::Thresholds).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::lenient;

const DEFAULT_ENTRY: &str = "default";

/// Derive the tenant id from a storage key.
///
/// Leading slashes and surrounding whitespace are ignored. A key without a
/// separator is its own tenant id. Empty keys have no tenant.
pub fn resolve_tenant(storage_key: Option<&str>) -> Option<String> {
    let cleaned = storage_key?.trim().trim_start_matches('/').trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.split('/').next().map(str::to_string)
}

/// Tenant attributes used by the analyzers and the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub risk_score_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub confidence_threshold: Option<f64>,
}

/// Read-only tenant configuration mapping.
#[derive(Debug, Clone, Default)]
pub struct TenantConfig {
    entries: HashMap<String, TenantProfile>,
}

impl TenantConfig {
    /// Configuration with no entries; every lookup yields an empty profile.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a parsed JSON document. Non-object documents and non-object
    /// entries are ignored.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            warn!("tenant config is not a JSON object; ignoring");
            return Self::empty();
        };

        let mut entries = HashMap::new();
        for (tenant, entry) in map {
            if !entry.is_object() {
                debug!(tenant = %tenant, "skipping non-object tenant entry");
                continue;
            }
            match serde_json::from_value::<TenantProfile>(entry) {
                Ok(profile) => {
                    entries.insert(tenant, profile);
                }
                Err(e) => warn!(tenant = %tenant, error = %e, "skipping unreadable tenant entry"),
            }
        }
        Self { entries }
    }

    /// Parse configuration text. Malformed JSON yields an empty configuration.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                warn!(error = %e, "tenant config is not valid JSON; using defaults");
                Self::empty()
            }
        }
    }

    /// Read configuration from disk. Unreadable files yield an empty configuration.
    pub fn from_path(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read tenant config");
                Self::empty()
            }
        }
    }

    /// Profile for a tenant, else the `"default"` entry, else an empty profile.
    ///
    /// The returned profile carries the requested tenant id.
    pub fn load_profile(&self, tenant_id: Option<&str>) -> TenantProfile {
        let found = tenant_id
            .and_then(|id| self.entries.get(id))
            .or_else(|| self.entries.get(DEFAULT_ENTRY));

        let mut profile = found.cloned().unwrap_or_default();
        profile.tenant_id = tenant_id.map(str::to_string);
        profile
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where tenant configuration comes from. Loaded fresh on every invocation.
#[derive(Debug, Clone)]
pub enum TenantSource {
    /// JSON file re-read each time a profile is needed.
    File(PathBuf),
    /// Fixed in-memory configuration.
    Fixed(TenantConfig),
}

impl TenantSource {
    pub fn load(&self) -> TenantConfig {
        match self {
            Self::File(path) => TenantConfig::from_path(path),
            Self::Fixed(config) => config.clone(),
        }
    }
}

impl Default for TenantSource {
    fn default() -> Self {
        Self::Fixed(TenantConfig::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sample() -> TenantConfig {
        TenantConfig::from_value(json!({
            "default": { "region": "US", "industry": "general" },
            "acme": {
                "region": "EU",
                "industry": "healthcare",
                "risk_score_threshold": 6.5,
                "confidence_threshold": "0.8"
            },
            "broken": "not-an-object"
        }))
    }

    #[test]
    fn tenant_is_first_segment() {
        assert_eq!(resolve_tenant(Some("acme/contracts/msa.pdf")).as_deref(), Some("acme"));
        assert_eq!(resolve_tenant(Some("/acme/msa.pdf")).as_deref(), Some("acme"));
    }

    #[test]
    fn bare_key_is_its_own_tenant() {
        assert_eq!(resolve_tenant(Some("contract.pdf")).as_deref(), Some("contract.pdf"));
    }

    #[test]
    fn empty_key_has_no_tenant() {
        assert_eq!(resolve_tenant(None), None);
        assert_eq!(resolve_tenant(Some("")), None);
        assert_eq!(resolve_tenant(Some("  / ")), None);
    }

    #[test]
    fn known_tenant_profile() {
        let profile = sample().load_profile(Some("acme"));
        assert_eq!(profile.tenant_id.as_deref(), Some("acme"));
        assert_eq!(profile.region.as_deref(), Some("EU"));
        assert_eq!(profile.risk_score_threshold, Some(6.5));
        assert_eq!(profile.confidence_threshold, Some(0.8));
    }

    #[test]
    fn unknown_tenant_falls_back_to_default() {
        let profile = sample().load_profile(Some("globex"));
        assert_eq!(profile.tenant_id.as_deref(), Some("globex"));
        assert_eq!(profile.region.as_deref(), Some("US"));
        assert_eq!(profile.risk_score_threshold, None);
    }

    #[test]
    fn missing_tenant_id_uses_default() {
        let profile = sample().load_profile(None);
        assert_eq!(profile.tenant_id, None);
        assert_eq!(profile.industry.as_deref(), Some("general"));
    }

    #[test]
    fn no_default_yields_empty_profile() {
        let config = TenantConfig::from_value(json!({ "acme": { "region": "EU" } }));
        let profile = config.load_profile(Some("globex"));
        assert_eq!(
            profile,
            TenantProfile {
                tenant_id: Some("globex".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let config = sample();
        assert_eq!(config.len(), 2);
        assert_eq!(config.load_profile(Some("broken")).region.as_deref(), Some("US"));
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        assert!(TenantConfig::from_json("{ not json").is_empty());
        assert!(TenantConfig::from_json("[1, 2, 3]").is_empty());
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let config = TenantConfig::from_path(Path::new("/nonexistent/tenant_config.json"));
        assert!(config.is_empty());
        assert_eq!(config.load_profile(Some("acme")).region, None);
    }

    #[test]
    fn file_source_is_reread_on_each_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default": {{"region": "US"}}}}"#).unwrap();
        let source = TenantSource::File(file.path().to_path_buf());
        assert_eq!(source.load().load_profile(None).region.as_deref(), Some("US"));

        std::fs::write(file.path(), r#"{"default": {"region": "EU"}}"#).unwrap();
        assert_eq!(source.load().load_profile(None).region.as_deref(), Some("EU"));
    }
}
