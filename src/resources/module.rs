//! Module spec: process-wide default policy

use super::cors::CorsSpec;
use super::mapping::RateLimitLabelSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the Module that carries global defaults
pub const GLOBAL_MODULE_NAME: &str = "ambassador";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    #[serde(default)]
    pub config: ModuleConfig,
}

/// Recognized Module options
///
/// `header_case_overrides` stays semi-structured: candidates that are not
/// header-name strings are dropped when rules are built, never at decode time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub cors: Option<CorsSpec>,

    #[serde(default)]
    pub header_case_overrides: Option<Value>,

    #[serde(default)]
    pub proper_case: bool,

    #[serde(default)]
    pub default_label_domain: Option<String>,

    #[serde(default)]
    pub default_labels: BTreeMap<String, Vec<RateLimitLabelSpec>>,

    #[serde(default)]
    pub add_linkerd_headers: Option<bool>,
}

impl ModuleConfig {
    /// Raw override candidates; anything but a list means "disabled"
    pub fn header_case_candidates(&self) -> Vec<Value> {
        match &self.header_case_overrides {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keeps_mixed_override_candidates() {
        let module: ModuleSpec = serde_json::from_value(json!({
            "config": {"header_case_overrides": ["X-ABC", "x-foo", 5, {}]}
        }))
        .unwrap();

        assert_eq!(module.config.header_case_candidates().len(), 4);
        assert!(!module.config.proper_case);
    }

    #[test]
    fn test_disabled_overrides_yield_no_candidates() {
        let module: ModuleSpec =
            serde_json::from_value(json!({"config": {"header_case_overrides": false}})).unwrap();
        assert!(module.config.header_case_candidates().is_empty());

        let empty: ModuleSpec = serde_json::from_value(json!({})).unwrap();
        assert!(empty.config.header_case_candidates().is_empty());
    }
}
