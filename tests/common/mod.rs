//! Common test utilities for all integration tests.
//!
//! Provides YAML manifest fixtures and small helpers for compiling them.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use routeplane::{compile, CompilerConfig, ConfigSnapshot, ResourceSet, TargetVersion};
use serde_json::Value;

/// Two Mappings sharing a signature plus a higher-priority one
pub const QOTM: &str = r#"
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: qotm
spec:
  prefix: /qotm/
  service: qotm
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: qotm-canary
spec:
  prefix: /qotm/
  service: qotm-canary
  weight: 10
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: slow
spec:
  prefix: /slow/
  service: slow:8080
  timeout_ms: 1500
  priority: 10
"#;

/// Two TLS Hosts, one without a cleartext port, and a host-less Mapping
pub const TLS_HOSTS: &str = r#"
---
apiVersion: getambassador.io/v2
kind: Host
metadata:
  name: tls-only
spec:
  hostname: secure.example.com
  tlsSecret:
    name: secure-cert
  requestPolicy:
    insecure:
      additionalPort: -1
---
apiVersion: getambassador.io/v2
kind: Host
metadata:
  name: routed
spec:
  hostname: open.example.com
  tlsSecret:
    name: open-cert
  requestPolicy:
    insecure:
      action: Route
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: secure-only
spec:
  prefix: /secure/
  service: secure
  host: secure.example.com
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: everywhere
spec:
  prefix: /shared/
  service: shared
"#;

/// Two TLS Hosts with distinct secrets, one routing and one redirecting
/// cleartext, plus a host-less Mapping
pub const ROUTE_AND_REDIRECT: &str = r#"
---
apiVersion: getambassador.io/v2
kind: Host
metadata:
  name: host-a
spec:
  hostname: a.example.com
  tlsSecret:
    name: a-cert
  requestPolicy:
    insecure:
      action: Route
---
apiVersion: getambassador.io/v2
kind: Host
metadata:
  name: host-b
spec:
  hostname: b.example.com
  tlsSecret:
    name: b-cert
  requestPolicy:
    insecure:
      action: Redirect
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: anywhere
spec:
  prefix: /anywhere/
  service: anywhere
"#;

/// A RateLimitService, a Module with default labels and a labelled Mapping
pub const RATE_LIMITED: &str = r#"
---
apiVersion: getambassador.io/v2
kind: RateLimitService
metadata:
  name: ratelimit
spec:
  service: ratelimit:5000
---
apiVersion: getambassador.io/v1
kind: Module
name: ambassador
config:
  default_labels:
    ambassador:
      - descriptor: global
---
apiVersion: getambassador.io/v2
kind: Mapping
metadata:
  name: limited
spec:
  prefix: /limited/
  service: limited
  labels:
    ambassador:
      - descriptor: per-route
        headers: [x-user]
      - {}
"#;

pub fn config(version: TargetVersion) -> CompilerConfig {
    CompilerConfig { target_version: version, ..CompilerConfig::default() }
}

pub fn compile_yaml(manifest: &str, version: TargetVersion) -> ConfigSnapshot {
    let resources = ResourceSet::from_yaml(manifest).expect("manifest decodes");
    compile(&resources, &config(version)).expect("manifest compiles")
}

pub fn document(manifest: &str, version: TargetVersion) -> Value {
    compile_yaml(manifest, version).config.as_value().expect("document renders")
}

/// V2 virtual hosts of the listener on `port`
pub fn v2_virtual_hosts(document: &Value, port: u16) -> Vec<Value> {
    document["static_resources"]["listeners"]
        .as_array()
        .expect("listeners")
        .iter()
        .filter(|l| l["address"]["socket_address"]["port_value"] == port)
        .flat_map(|l| l["filter_chains"].as_array().cloned().unwrap_or_default())
        .flat_map(|chain| {
            chain["filters"][0]["typed_config"]["route_config"]["virtual_hosts"]
                .as_array()
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

pub fn route_prefixes(routes: &Value) -> Vec<String> {
    routes
        .as_array()
        .expect("routes")
        .iter()
        .filter_map(|r| r["match"]["prefix"].as_str().or(r["prefix"].as_str()))
        .map(str::to_string)
        .collect()
}
