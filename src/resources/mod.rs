//! Resource model
//!
//! Typed in-memory records for the declarative resources the compiler
//! understands. A [`Resource`] is the raw record (identity, labels and a
//! semi-structured spec); [`Resource::typed`] decodes and validates the spec
//! into one of the kind-specific structs.
//!
//! ## Module Organization
//!
//! - `manifest`: multi-document YAML decoding into a [`ResourceSet`]
//! - `mapping`, `host`, `tls_context`, `module`, `ratelimit_service`: typed specs
//! - `cors`: the CORS block shared by Mapping and Module

pub mod cors;
pub mod host;
pub mod manifest;
pub mod mapping;
pub mod module;
pub mod ratelimit_service;
pub mod tls_context;

pub use cors::{CorsSpec, StringOrList};
pub use host::{
    ContextRef, HostSpec, InlineTls, InsecureAction, InsecurePolicySpec, LabelSelector,
    RequestPolicy, SecretRef,
};
pub use mapping::{AddHeaderSpec, MappingSpec, RateLimitLabelSpec};
pub use module::{ModuleConfig, ModuleSpec, GLOBAL_MODULE_NAME};
pub use manifest::parse_manifests;
pub use ratelimit_service::{RateLimitServiceSpec, DEFAULT_RATELIMIT_DOMAIN};
pub use tls_context::{TlsContextSpec, TlsVersion};

use crate::errors::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Namespace assumed when a resource does not declare one
pub const DEFAULT_NAMESPACE: &str = "default";

/// `ambassador_id` assumed when a resource does not declare one
pub const DEFAULT_AMBASSADOR_ID: &str = "default";

/// Resource kinds recognized by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Mapping,
    Host,
    #[serde(rename = "TLSContext")]
    TlsContext,
    Module,
    RateLimitService,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Mapping => "Mapping",
            ResourceKind::Host => "Host",
            ResourceKind::TlsContext => "TLSContext",
            ResourceKind::Module => "Module",
            ResourceKind::RateLimitService => "RateLimitService",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Mapping" => Ok(ResourceKind::Mapping),
            "Host" => Ok(ResourceKind::Host),
            "TLSContext" => Ok(ResourceKind::TlsContext),
            "Module" => Ok(ResourceKind::Module),
            "RateLimitService" => Ok(ResourceKind::RateLimitService),
            other => Err(Error::validation_field(format!("Unknown resource kind '{}'", other), "kind")),
        }
    }
}

/// Identity and labels of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ResourceMeta {
    pub fn new<N: Into<String>, S: Into<String>>(kind: ResourceKind, namespace: S, name: N) -> Self {
        Self { kind, name: name.into(), namespace: namespace.into(), labels: BTreeMap::new() }
    }

    /// Resource key, `name.namespace`
    pub fn rkey(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }
}

/// One raw resource record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub meta: ResourceMeta,
    pub spec: Value,
}

/// A resource spec decoded into its kind-specific form
#[derive(Debug, Clone)]
pub enum TypedResource {
    Mapping(MappingSpec),
    Host(HostSpec),
    TlsContext(TlsContextSpec),
    Module(ModuleSpec),
    RateLimitService(RateLimitServiceSpec),
}

impl Resource {
    pub fn new<S: Into<String>, N: Into<String>>(
        kind: ResourceKind,
        namespace: S,
        name: N,
        spec: Value,
    ) -> Self {
        Self { meta: ResourceMeta::new(kind, namespace, name), spec }
    }

    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.meta.labels = labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.meta.kind
    }

    pub fn rkey(&self) -> String {
        self.meta.rkey()
    }

    /// The `ambassador_id` values this resource is scoped to
    pub fn ambassador_ids(&self) -> Vec<String> {
        match self.spec.get("ambassador_id") {
            Some(Value::String(id)) => vec![id.clone()],
            Some(Value::Array(ids)) => {
                ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect()
            }
            _ => vec![DEFAULT_AMBASSADOR_ID.to_string()],
        }
    }

    /// Deserialize the spec into `T`, reporting failures against this resource
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.spec.clone()).map_err(|err| self.invalid(err.to_string()))
    }

    /// Decode and validate the spec according to the resource kind
    pub fn typed(&self) -> Result<TypedResource> {
        let typed = match self.meta.kind {
            ResourceKind::Mapping => {
                let spec: MappingSpec = self.decode()?;
                spec.check().map_err(|err| self.invalid(err.to_string()))?;
                TypedResource::Mapping(spec)
            }
            ResourceKind::Host => {
                let spec: HostSpec = self.decode()?;
                spec.check().map_err(|err| self.invalid(err.to_string()))?;
                TypedResource::Host(spec)
            }
            ResourceKind::TlsContext => {
                let spec: TlsContextSpec = self.decode()?;
                spec.check().map_err(|err| self.invalid(err.to_string()))?;
                TypedResource::TlsContext(spec)
            }
            ResourceKind::Module => TypedResource::Module(self.decode()?),
            ResourceKind::RateLimitService => {
                let spec: RateLimitServiceSpec = self.decode()?;
                spec.check().map_err(|err| self.invalid(err.to_string()))?;
                TypedResource::RateLimitService(spec)
            }
        };

        Ok(typed)
    }

    fn invalid<M: Into<String>>(&self, message: M) -> Error {
        Error::invalid_resource(self.meta.kind.as_str(), self.rkey(), message)
    }
}

/// An ordered, fully materialized snapshot of resources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    resources: Vec<Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.meta.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<Resource> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self { resources: iter.into_iter().collect() }
    }
}

impl Extend<Resource> for ResourceSet {
    fn extend<I: IntoIterator<Item = Resource>>(&mut self, iter: I) {
        self.resources.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in [
            ResourceKind::Mapping,
            ResourceKind::Host,
            ResourceKind::TlsContext,
            ResourceKind::Module,
            ResourceKind::RateLimitService,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
        assert!("Secret".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_ambassador_ids() {
        let scalar = Resource::new(
            ResourceKind::Mapping,
            "default",
            "a",
            json!({"ambassador_id": "edge", "prefix": "/", "service": "a"}),
        );
        assert_eq!(scalar.ambassador_ids(), vec!["edge".to_string()]);

        let list = Resource::new(
            ResourceKind::Mapping,
            "default",
            "b",
            json!({"ambassador_id": ["edge", "internal"], "prefix": "/", "service": "b"}),
        );
        assert_eq!(list.ambassador_ids().len(), 2);

        let implicit =
            Resource::new(ResourceKind::Mapping, "default", "c", json!({"prefix": "/", "service": "c"}));
        assert_eq!(implicit.ambassador_ids(), vec![DEFAULT_AMBASSADOR_ID.to_string()]);
    }

    #[test]
    fn test_typed_rejects_malformed_mapping() {
        let resource =
            Resource::new(ResourceKind::Mapping, "default", "broken", json!({"prefix": "/x/"}));
        let err = resource.typed().expect_err("service is required");
        assert!(matches!(err, Error::InvalidResource { .. }));
        assert!(err.to_string().contains("broken.default"));
    }

    #[test]
    fn test_of_kind_preserves_order() {
        let set: ResourceSet = vec![
            Resource::new(ResourceKind::Mapping, "default", "one", json!({})),
            Resource::new(ResourceKind::Host, "default", "h", json!({})),
            Resource::new(ResourceKind::Mapping, "default", "two", json!({})),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> =
            set.of_kind(ResourceKind::Mapping).map(|r| r.meta.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(set.len(), 3);
    }
}
