//! # Config Emitter
//!
//! [`generate`] walks an [`Ir`] and builds the output document: routes in
//! emission order split into flat and SNI buckets, clusters, listeners and
//! the rate-limit service. The node types are version neutral; [`v1`] and
//! [`v2`] render them into the two supported schemas, which differ only in
//! nesting and field names.

pub mod cluster;
pub mod context;
pub mod header_case;
pub mod listener;
pub mod ratelimit_action;
pub mod route;
pub mod v1;
pub mod v2;

pub use cluster::Cluster;
pub use context::{BuildContext, ElementTable};
pub use header_case::build_header_case_rules;
pub use listener::{FilterChain, Listener, PlacedRoute, VirtualHost};
pub use ratelimit_action::{ActionList, RateLimitAction};
pub use route::{format_timeout, ForwardAction, Route, RouteAction, RouteMatch};

use crate::emit_span;
use crate::errors::{Error, Result};
use crate::ir::{Ir, SniInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Output schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetVersion {
    #[serde(rename = "v1", alias = "V1")]
    V1,
    #[default]
    #[serde(rename = "v2", alias = "V2")]
    V2,
}

impl TargetVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetVersion::V1 => "v1",
            TargetVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(TargetVersion::V1),
            "v2" => Ok(TargetVersion::V2),
            other => Err(Error::validation_field(
                format!("Unknown target version '{}', expected v1 or v2", other),
                "target_version",
            )),
        }
    }
}

/// A route bound to a TLS certificate context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SniRoute {
    pub route: Arc<Route>,
    pub info: SniInfo,
}

/// Rate-limit service settings carried in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitServiceConfig {
    pub domain: String,
    pub cluster: String,
    pub timeout_ms: u64,
}

/// One generation's output document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvoyConfig {
    pub version: TargetVersion,
    pub routes: Vec<Arc<Route>>,
    pub sni_routes: Vec<SniRoute>,
    pub clusters: Vec<Arc<Cluster>>,
    pub listeners: Vec<Listener>,
    pub ratelimit: Option<RateLimitServiceConfig>,
}

impl EnvoyConfig {
    /// The document rendered for its target version
    pub fn as_value(&self) -> Result<Value> {
        match self.version {
            TargetVersion::V1 => v1::render(self),
            TargetVersion::V2 => v2::render(self),
        }
    }

    /// Compact JSON; byte-identical for identical IRs
    pub fn as_json(&self) -> Result<String> {
        let value = self.as_value()?;
        serde_json::to_string(&value)
            .map_err(|e| Error::from(e).with_context("rendering document"))
    }

    pub fn as_json_pretty(&self) -> Result<String> {
        let value = self.as_value()?;
        serde_json::to_string_pretty(&value)
            .map_err(|e| Error::from(e).with_context("rendering document"))
    }

    /// SHA-256 of the compact JSON, hex encoded
    pub fn digest(&self) -> Result<String> {
        let json = self.as_json()?;
        Ok(hex::encode(Sha256::digest(json.as_bytes())))
    }
}

/// Emit the document for `ir`
pub fn generate(ir: &Ir, version: TargetVersion) -> Result<EnvoyConfig> {
    let _span = emit_span!(version).entered();
    let mut context = BuildContext::new();

    let sni: HashMap<usize, &SniInfo> =
        ir.partition.sni_routes.iter().map(|(index, info)| (*index, info)).collect();

    let mut placed = Vec::with_capacity(ir.groups.len());
    for (index, group) in ir.groups.iter().enumerate() {
        let route = context.routes.save(Route::from_group(group, ir.ratelimit.as_ref()))?;
        placed.push(PlacedRoute { route, sni: sni.get(&index).map(|info| (*info).clone()) });
    }

    let mut routes = Vec::new();
    let mut sni_routes = Vec::new();
    for entry in &placed {
        match &entry.sni {
            Some(info) => {
                sni_routes.push(SniRoute { route: Arc::clone(&entry.route), info: info.clone() })
            }
            None => routes.push(Arc::clone(&entry.route)),
        }
    }

    let clusters = cluster::clusters_for(ir)
        .into_iter()
        .map(|cluster| context.clusters.save(cluster))
        .collect::<Result<Vec<_>>>()?;

    let listeners = listener::build_listeners(ir, &placed, &mut context)?;

    let ratelimit = ir.ratelimit.as_ref().map(|rls| RateLimitServiceConfig {
        domain: rls.domain.clone(),
        cluster: rls.cluster.name.clone(),
        timeout_ms: rls.timeout_ms,
    });

    debug!(
        routes = routes.len(),
        sni_routes = sni_routes.len(),
        clusters = clusters.len(),
        listeners = listeners.len(),
        shared_elements = context.total_hits(),
        "Generated document"
    );

    Ok(EnvoyConfig { version, routes, sni_routes, clusters, listeners, ratelimit })
}
