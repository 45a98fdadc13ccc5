//! # Intermediate Representation
//!
//! [`Ir::build`] turns one ordered resource snapshot into an immutable,
//! fully resolved model: the global Module, Hosts with their TLS bindings,
//! MappingGroups in emission order, the rate-limit service and the SNI
//! partition. Emitters only read the IR.
//!
//! Malformed resources are skipped with a [`ConfigNotice`]; a snapshot in
//! which nothing usable remains fails with [`Error::NoUsableResources`].

pub mod cluster;
pub mod cors;
pub mod mapping;
pub mod module;
pub mod ratelimit;
pub mod resolve;
pub mod tls;

pub use cluster::IrCluster;
pub use cors::{CorsPolicy, IrCors};
pub use mapping::{
    AddedHeader, GroupKey, HeaderMatcher, HostMatch, IrMapping, MappingGroup, PathMatch,
    RedirectTarget, WeightedCluster, DEFAULT_TIMEOUT_MS,
};
pub use module::IrModule;
pub use ratelimit::IrRateLimitService;
pub use resolve::resolve;
pub use tls::{CleartextPolicy, IrHost, IrTlsContext, SecretInfo, TlsBinding, TlsSource};

use crate::config::CompilerConfig;
use crate::errors::{ConfigNotice, Error, NoticeKind, Result};
use crate::resources::{Resource, ResourceSet, TypedResource};
use mapping::GroupBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Collects non-fatal problems, logging each as it is reported
#[derive(Debug, Clone, Default)]
pub struct Notices {
    notices: Vec<ConfigNotice>,
}

impl Notices {
    pub fn report<R: Into<String>, M: Into<String>>(&mut self, kind: NoticeKind, resource: R, message: M) {
        let notice = ConfigNotice::new(kind, resource, message);
        warn!(kind = %notice.kind, resource = %notice.resource, "{}", notice.message);
        self.notices.push(notice);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigNotice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn into_vec(self) -> Vec<ConfigNotice> {
        self.notices
    }
}

/// SNI data attached to a route bound to a TLS hostname
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SniInfo {
    pub hosts: Vec<String>,
    pub secret_info: SecretInfo,
}

/// Indexes into [`Ir::groups`], split by whether a group needs its own
/// certificate context. Both lists keep emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePartition {
    pub sni_routes: Vec<(usize, SniInfo)>,
    pub routes: Vec<usize>,
}

/// Fully resolved model of one generation
#[derive(Debug, Clone)]
pub struct Ir {
    pub ambassador_id: String,
    pub listen_address: String,
    pub cleartext_port: u16,
    pub tls_port: u16,
    pub module: IrModule,
    pub hosts: Vec<IrHost>,
    /// In emission order: priority descending, then resource order
    pub groups: Vec<MappingGroup>,
    /// Distinct upstreams, in first-use order
    pub clusters: Vec<IrCluster>,
    pub ratelimit: Option<IrRateLimitService>,
    pub partition: RoutePartition,
    pub notices: Vec<ConfigNotice>,
}

impl Ir {
    /// Build the IR for one resource snapshot
    pub fn build(resources: &ResourceSet, config: &CompilerConfig) -> Result<Self> {
        let mut notices = Notices::default();
        let typed = decode_resources(resources, &config.ambassador_id, &mut notices);

        if typed.is_empty() {
            return Err(Error::no_usable_resources(format!(
                "{} resources supplied, none valid for ambassador_id '{}'",
                resources.len(),
                config.ambassador_id
            )));
        }

        let mut modules = Vec::new();
        let mut services = Vec::new();
        let mut contexts = Vec::new();
        let mut host_specs = Vec::new();
        let mut mapping_specs = Vec::new();

        for (resource, spec) in typed {
            match spec {
                TypedResource::Module(spec) => modules.push((resource, spec)),
                TypedResource::RateLimitService(spec) => services.push((resource, spec)),
                TypedResource::TlsContext(spec) => contexts.push(IrTlsContext::new(resource, spec)),
                TypedResource::Host(spec) => host_specs.push((resource, spec)),
                TypedResource::Mapping(spec) => mapping_specs.push((resource, spec)),
            }
        }

        let module = module::resolve_module(modules, &mut notices);
        let ratelimit = ratelimit::resolve_ratelimit_service(services, &mut notices);

        let resolved_hosts: Vec<IrHost> = host_specs
            .iter()
            .map(|(resource, spec)| tls::resolve_host(resource, spec, &contexts, &mut notices))
            .collect();
        let hosts = tls::register_hosts(resolved_hosts, &contexts, &mut notices);

        let mut builder = GroupBuilder::default();
        for (resource, spec) in mapping_specs {
            builder.add(IrMapping::new(resource, spec, &hosts, &module));
        }
        let groups = builder.finish(&module, ratelimit.as_ref(), &mut notices);

        let clusters = collect_clusters(&groups);
        let partition = partition_routes(&groups, &hosts);

        debug!(
            groups = groups.len(),
            hosts = hosts.len(),
            clusters = clusters.len(),
            sni_routes = partition.sni_routes.len(),
            routes = partition.routes.len(),
            "Built IR"
        );

        Ok(Self {
            ambassador_id: config.ambassador_id.clone(),
            listen_address: config.listen_address.clone(),
            cleartext_port: config.cleartext_port,
            tls_port: config.tls_port,
            module,
            hosts,
            groups,
            clusters,
            ratelimit,
            partition,
            notices: notices.into_vec(),
        })
    }

    /// Hosts that carry TLS material
    pub fn tls_hosts(&self) -> impl Iterator<Item = (&IrHost, &TlsBinding)> {
        self.hosts.iter().filter_map(|host| host.tls.as_ref().map(|tls| (host, tls)))
    }
}

/// Keep in-scope resources whose specs decode and validate
fn decode_resources<'a>(
    resources: &'a ResourceSet,
    ambassador_id: &str,
    notices: &mut Notices,
) -> Vec<(&'a Resource, TypedResource)> {
    resources
        .iter()
        .filter(|resource| {
            let in_scope = resource.ambassador_ids().iter().any(|id| id == ambassador_id);
            if !in_scope {
                debug!(resource = %resource.rkey(), "Skipping resource for another ambassador_id");
            }
            in_scope
        })
        .filter_map(|resource| match resource.typed() {
            Ok(typed) => Some((resource, typed)),
            Err(err) => {
                notices.report(NoticeKind::InvalidResource, resource.rkey(), err.to_string());
                None
            }
        })
        .collect()
}

fn collect_clusters(groups: &[MappingGroup]) -> Vec<IrCluster> {
    let mut clusters: BTreeMap<String, usize> = BTreeMap::new();
    let mut ordered = Vec::new();

    for mapping in groups.iter().filter(|g| !g.is_redirect()).flat_map(|g| &g.mappings) {
        if !clusters.contains_key(&mapping.cluster.name) {
            clusters.insert(mapping.cluster.name.clone(), ordered.len());
            ordered.push(mapping.cluster.clone());
        }
    }

    ordered
}

/// Route groups whose exact host has a TLS binding into the SNI bucket
fn partition_routes(groups: &[MappingGroup], hosts: &[IrHost]) -> RoutePartition {
    let mut partition = RoutePartition::default();

    for (index, group) in groups.iter().enumerate() {
        let binding = group.exact_host().and_then(|hostname| {
            hosts.iter().find(|h| h.hostname == hostname).and_then(|h| h.tls.as_ref())
        });

        match binding {
            Some(tls) => partition.sni_routes.push((
                index,
                SniInfo { hosts: tls.hosts.clone(), secret_info: tls.secret_info.clone() },
            )),
            None => partition.routes.push(index),
        }
    }

    partition
}
