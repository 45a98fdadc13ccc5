//! Host spec: binds a hostname to TLS material and a cleartext policy

use super::tls_context::TlsVersion;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Reference to a TLS secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Reference to a TLSContext by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRef {
    pub name: String,
}

/// Inline TLS parameters carried directly on the Host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineTls {
    #[serde(default)]
    pub min_tls_version: Option<TlsVersion>,
    #[serde(default)]
    pub max_tls_version: Option<TlsVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default, rename = "matchLabels")]
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// An empty selector matches nothing
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.match_labels.is_empty()
            && self.match_labels.iter().all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// What happens to cleartext requests for a Host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsecureAction {
    Route,
    Redirect,
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsecurePolicySpec {
    #[serde(default)]
    pub action: Option<InsecureAction>,
    /// `-1` disables the cleartext port for this Host
    #[serde(default)]
    pub additional_port: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPolicy {
    #[serde(default)]
    pub insecure: Option<InsecurePolicySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HostSpec {
    #[validate(length(min = 1, max = 253, message = "Host hostname must be 1-253 characters"))]
    pub hostname: String,

    #[serde(default)]
    pub selector: Option<LabelSelector>,

    #[serde(default)]
    pub tls_secret: Option<SecretRef>,

    #[serde(default)]
    pub tls_context: Option<ContextRef>,

    #[serde(default)]
    pub tls: Option<InlineTls>,

    #[serde(default)]
    pub request_policy: Option<RequestPolicy>,
}

impl HostSpec {
    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        if self.tls.is_some() && self.tls_secret.is_none() {
            return Err(Error::validation_field("Inline tls requires tlsSecret", "tls"));
        }

        if let Some(tls) = &self.tls {
            if let (Some(min), Some(max)) = (tls.min_tls_version, tls.max_tls_version) {
                if min > max {
                    return Err(Error::validation_field(
                        "min_tls_version cannot exceed max_tls_version",
                        "tls",
                    ));
                }
            }
        }

        if let Some(port) = self.insecure().and_then(|p| p.additional_port) {
            if port != -1 && !(1..=65535).contains(&port) {
                return Err(Error::validation_field(
                    "additionalPort must be -1 or a valid port",
                    "requestPolicy.insecure.additionalPort",
                ));
            }
        }

        Ok(())
    }

    pub fn insecure(&self) -> Option<&InsecurePolicySpec> {
        self.request_policy.as_ref().and_then(|policy| policy.insecure.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_camel_case_fields() {
        let host: HostSpec = serde_json::from_value(json!({
            "hostname": "foo.example.com",
            "acmeProvider": {"authority": "none"},
            "tlsSecret": {"name": "foo-secret"},
            "selector": {"matchLabels": {"hostname": "foo"}},
            "requestPolicy": {"insecure": {"action": "Route", "additionalPort": 8080}}
        }))
        .unwrap();

        assert_eq!(host.tls_secret.as_ref().unwrap().name, "foo-secret");
        assert_eq!(host.insecure().unwrap().action, Some(InsecureAction::Route));
        assert!(host.check().is_ok());
    }

    #[test]
    fn test_selector_requires_every_label() {
        let selector = LabelSelector {
            match_labels: BTreeMap::from([("hostname".to_string(), "foo".to_string())]),
        };
        let mut labels = BTreeMap::new();
        assert!(!selector.matches(&labels));
        labels.insert("hostname".to_string(), "foo".to_string());
        assert!(selector.matches(&labels));
        assert!(!LabelSelector::default().matches(&labels));
    }

    #[test]
    fn test_rejects_inverted_inline_versions() {
        let host: HostSpec = serde_json::from_value(json!({
            "hostname": "foo.example.com",
            "tlsSecret": {"name": "s"},
            "tls": {"min_tls_version": "v1.3", "max_tls_version": "v1.2"}
        }))
        .unwrap();
        assert!(host.check().is_err());
    }

    #[test]
    fn test_rejects_bad_additional_port() {
        let host: HostSpec = serde_json::from_value(json!({
            "hostname": "foo.example.com",
            "requestPolicy": {"insecure": {"additionalPort": -7}}
        }))
        .unwrap();
        assert!(host.check().is_err());
    }
}
