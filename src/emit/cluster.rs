//! Cluster nodes

use crate::ir::{Ir, IrCluster};
use serde::Serialize;

/// Connect timeout for every generated upstream
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cluster {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub connect_timeout_ms: u64,
    /// Ask the upstream codec for proper-case header names
    pub proper_case: bool,
}

impl Cluster {
    pub fn from_ir(cluster: &IrCluster, proper_case: bool) -> Self {
        Self {
            name: cluster.name.clone(),
            host: cluster.host.clone(),
            port: cluster.port,
            tls: cluster.tls,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            proper_case,
        }
    }
}

/// Upstream clusters followed by the rate-limit service cluster, if any
pub fn clusters_for(ir: &Ir) -> Vec<Cluster> {
    let proper_case = ir.module.proper_case;
    let mut clusters: Vec<Cluster> =
        ir.clusters.iter().map(|cluster| Cluster::from_ir(cluster, proper_case)).collect();

    if let Some(rls) = &ir.ratelimit {
        if !clusters.iter().any(|c| c.name == rls.cluster.name) {
            clusters.push(Cluster::from_ir(&rls.cluster, false));
        }
    }

    clusters
}
