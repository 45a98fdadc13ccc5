//! CORS resolution
//!
//! An [`IrCors`] remembers where it came from so that notices and debug
//! output can point at the owning resource. Those bookkeeping fields never
//! reach the emitted document: [`IrCors::policy`] strips them.

use crate::resources::CorsSpec;
use serde::{Deserialize, Serialize};

/// A CORS block attached to a Mapping or the global Module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrCors {
    pub rkey: String,
    pub location: String,
    pub kind: &'static str,
    pub name: String,
    pub referenced_by: Vec<String>,
    pub active: bool,
    pub spec: CorsSpec,
}

/// CORS policy as it appears in an emitted route
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorsPolicy {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub allow_origin: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub allow_methods: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub allow_headers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expose_headers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub allow_credentials: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_age: Option<String>,
}

impl IrCors {
    pub fn new(kind: &'static str, rkey: &str, name: &str, spec: CorsSpec) -> Self {
        Self {
            rkey: rkey.to_string(),
            location: rkey.to_string(),
            kind,
            name: name.to_string(),
            referenced_by: vec![rkey.to_string()],
            active: true,
            spec,
        }
    }

    /// The output policy, or `None` when nothing survives
    pub fn policy(&self) -> Option<CorsPolicy> {
        if !self.active {
            return None;
        }

        let joined = |value: &Option<crate::resources::StringOrList>| {
            value.as_ref().map(|v| v.to_vec().join(",")).filter(|s| !s.is_empty())
        };

        let policy = CorsPolicy {
            allow_origin: self.spec.origins.as_ref().map(|o| o.to_vec()).unwrap_or_default(),
            allow_methods: joined(&self.spec.methods),
            allow_headers: joined(&self.spec.headers),
            expose_headers: joined(&self.spec.exposed_headers),
            allow_credentials: self.spec.credentials,
            max_age: self.spec.max_age.as_ref().map(|m| m.as_string()).filter(|s| !s.is_empty()),
        };

        if policy == CorsPolicy::default() {
            None
        } else {
            Some(policy)
        }
    }
}
