//! Manifest decoding
//!
//! Turns already-fetched multi-document YAML text into an ordered
//! [`ResourceSet`]. Two document shapes are accepted:
//!
//! ```yaml
//! apiVersion: getambassador.io/v2
//! kind: Mapping
//! metadata: { name: qotm, namespace: default, labels: { app: qotm } }
//! spec: { prefix: /qotm/, service: qotm }
//! ---
//! apiVersion: getambassador.io/v1
//! kind: Module
//! name: ambassador
//! config: { proper_case: true }
//! ```
//!
//! Kinds the compiler does not handle (Secrets, Services, ...) are skipped,
//! and documents that cannot be turned into a resource are logged and skipped.
//! Broken YAML syntax fails the whole decode.

use super::{Resource, ResourceKind, ResourceMeta, ResourceSet, DEFAULT_NAMESPACE};
use crate::errors::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const ENVELOPE_KEYS: [&str; 5] = ["apiVersion", "kind", "name", "namespace", "metadata"];

impl ResourceSet {
    /// Decode a multi-document YAML manifest
    pub fn from_yaml(text: &str) -> Result<Self> {
        parse_manifests(text)
    }
}

/// Decode a multi-document YAML manifest into resources, in document order
pub fn parse_manifests(text: &str) -> Result<ResourceSet> {
    let mut set = ResourceSet::new();

    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let yaml = serde_yaml::Value::deserialize(document)
            .map_err(|err| Error::from(err).with_context(format!("manifest document {}", index)))?;

        if yaml.is_null() {
            continue;
        }

        let value = match serde_json::to_value(&yaml) {
            Ok(value) => value,
            Err(err) => {
                warn!(document = index, error = %err, "Skipping manifest document with non-string keys");
                continue;
            }
        };

        if let Some(resource) = resource_from_document(index, value) {
            set.push(resource);
        }
    }

    debug!(resources = set.len(), "Decoded manifest");
    Ok(set)
}

fn resource_from_document(index: usize, value: Value) -> Option<Resource> {
    let Value::Object(mut document) = value else {
        warn!(document = index, "Skipping manifest document that is not a mapping");
        return None;
    };

    let Some(kind_name) = document.get("kind").and_then(Value::as_str).map(str::to_string) else {
        warn!(document = index, "Skipping manifest document without a kind");
        return None;
    };

    let kind = match kind_name.parse::<ResourceKind>() {
        Ok(kind) => kind,
        Err(_) => {
            debug!(document = index, kind = %kind_name, "Skipping unhandled kind");
            return None;
        }
    };

    let metadata = document.get("metadata").and_then(Value::as_object).cloned().unwrap_or_default();

    let name = string_field(&metadata, "name").or_else(|| string_field(&document, "name"));
    let Some(name) = name else {
        warn!(document = index, kind = %kind, "Skipping resource without a name");
        return None;
    };

    let namespace = string_field(&metadata, "namespace")
        .or_else(|| string_field(&document, "namespace"))
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let labels: BTreeMap<String, String> = metadata
        .get("labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let spec = match document.remove("spec") {
        Some(spec) => spec,
        None => {
            for key in ENVELOPE_KEYS {
                document.remove(key);
            }
            Value::Object(document)
        }
    };

    Some(Resource { meta: ResourceMeta { kind, name, namespace, labels }, spec })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}
