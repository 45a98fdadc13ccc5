//! Mapping grouping
//!
//! Mappings that share a match signature (host match, path match, case
//! sensitivity and the sorted header-matcher set) collapse into one
//! [`MappingGroup`], which is emitted as a single route with a weighted
//! upstream set. Group-wide attributes (priority, timeout, rewrites, CORS,
//! rate-limit labels) come from the group's first member.

use super::cluster::IrCluster;
use super::cors::{CorsPolicy, IrCors};
use super::module::IrModule;
use super::ratelimit::{labels_for_domain, IrRateLimitService};
use super::resolve::resolve_cloned;
use super::tls::IrHost;
use super::Notices;
use crate::errors::NoticeKind;
use crate::resources::{MappingSpec, RateLimitLabelSpec, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Route timeout applied when a Mapping does not set `timeout_ms`
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Header carrying the request authority; host matches are expressed through it
pub const AUTHORITY_HEADER: &str = ":authority";

const LINKERD_HEADER: &str = "l5d-dst-override";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostMatch {
    Exact(String),
    Regex(String),
}

impl HostMatch {
    pub fn exact(&self) -> Option<&str> {
        match self {
            HostMatch::Exact(host) => Some(host),
            HostMatch::Regex(_) => None,
        }
    }

    fn matcher(&self) -> HeaderMatcher {
        let (value, regex) = match self {
            HostMatch::Exact(host) => (host.clone(), false),
            HostMatch::Regex(pattern) => (pattern.clone(), true),
        };
        HeaderMatcher { name: AUTHORITY_HEADER.to_string(), value, regex }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathMatch {
    Prefix(String),
    Regex(String),
}

/// One header match clause; `regex` selects regex over exact matching
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeaderMatcher {
    pub name: String,
    pub value: String,
    pub regex: bool,
}

/// The match signature shared by every member of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub host: Option<HostMatch>,
    pub path: PathMatch,
    pub case_sensitive: bool,
    /// Sorted by name, then value
    pub headers: Vec<HeaderMatcher>,
}

impl GroupKey {
    pub fn for_mapping(spec: &MappingSpec, host: Option<HostMatch>) -> Self {
        let path = if spec.prefix_regex {
            PathMatch::Regex(spec.prefix.clone())
        } else {
            PathMatch::Prefix(spec.prefix.clone())
        };

        let mut headers: Vec<HeaderMatcher> = spec
            .headers
            .iter()
            .map(|(name, value)| HeaderMatcher { name: name.clone(), value: value.clone(), regex: false })
            .chain(spec.regex_headers.iter().map(|(name, value)| HeaderMatcher {
                name: name.clone(),
                value: value.clone(),
                regex: true,
            }))
            .collect();
        headers.sort();

        Self { host, path, case_sensitive: spec.case_sensitive.unwrap_or(true), headers }
    }
}

/// A request header added on the way upstream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddedHeader {
    pub key: String,
    pub value: String,
    pub append: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightedCluster {
    pub name: String,
    pub weight: u32,
    pub request_headers_to_add: Vec<AddedHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub host_redirect: String,
    pub path_redirect: Option<String>,
}

/// A validated Mapping with its host and upstream resolved
#[derive(Debug, Clone)]
pub struct IrMapping {
    pub rkey: String,
    pub spec: MappingSpec,
    pub host: Option<HostMatch>,
    pub cluster: IrCluster,
    pub cors: Option<IrCors>,
    pub add_linkerd_headers: bool,
}

impl IrMapping {
    /// Resolve a Mapping's host (explicit, or inherited through a Host selector)
    pub fn new(resource: &Resource, spec: MappingSpec, hosts: &[IrHost], module: &IrModule) -> Self {
        let rkey = resource.rkey();

        let host = match &spec.host {
            Some(host) if spec.host_regex => Some(HostMatch::Regex(host.clone())),
            Some(host) => Some(HostMatch::Exact(host.to_ascii_lowercase())),
            None => hosts
                .iter()
                .find(|h| h.selector.as_ref().is_some_and(|s| s.matches(&resource.meta.labels)))
                .map(|h| HostMatch::Exact(h.hostname.clone())),
        };

        let cors = spec.cors.clone().map(|cors| IrCors::new("Mapping", &rkey, &resource.meta.name, cors));

        Self {
            cluster: IrCluster::from_service(&spec.service),
            add_linkerd_headers: spec.add_linkerd_headers.unwrap_or(module.add_linkerd_headers),
            rkey,
            host,
            cors,
            spec,
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::for_mapping(&self.spec, self.host.clone())
    }

    fn added_headers(&self) -> impl Iterator<Item = AddedHeader> + '_ {
        self.spec.add_request_headers.iter().map(|(key, header)| AddedHeader {
            key: key.clone(),
            value: header.value().to_string(),
            append: header.append(),
        })
    }
}

/// Mappings sharing one match signature, emitted as a single route
#[derive(Debug, Clone)]
pub struct MappingGroup {
    pub key: GroupKey,
    /// Position of the group's first member in resource order
    pub order: usize,
    pub mappings: Vec<IrMapping>,
    pub priority: i32,
    pub timeout_ms: u64,
    pub rewrite: Option<String>,
    pub host_rewrite: Option<String>,
    pub auto_host_rewrite: Option<bool>,
    pub cors: Option<CorsPolicy>,
    pub rate_limit_labels: Vec<RateLimitLabelSpec>,
    pub redirect: Option<RedirectTarget>,
    pub clusters: Vec<WeightedCluster>,
    pub request_headers_to_add: Vec<AddedHeader>,
}

impl MappingGroup {
    /// Header matchers including the host match, in emission order
    pub fn headers(&self) -> Vec<HeaderMatcher> {
        let mut headers = self.key.headers.clone();
        if let Some(host) = &self.key.host {
            headers.push(host.matcher());
        }
        headers
    }

    /// Exact hostname this group is bound to, if any
    pub fn exact_host(&self) -> Option<&str> {
        self.key.host.as_ref().and_then(HostMatch::exact)
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }
}

/// Accumulates Mappings into groups while preserving first-seen order
#[derive(Debug, Default)]
pub(crate) struct GroupBuilder {
    pending: Vec<(GroupKey, Vec<IrMapping>)>,
    index: HashMap<GroupKey, usize>,
}

impl GroupBuilder {
    pub fn add(&mut self, mapping: IrMapping) {
        let key = mapping.key();
        match self.index.get(&key) {
            Some(&position) => self.pending[position].1.push(mapping),
            None => {
                self.index.insert(key.clone(), self.pending.len());
                self.pending.push((key, vec![mapping]));
            }
        }
    }

    /// Resolve group attributes and weights, then order by priority
    pub fn finish(
        self,
        module: &IrModule,
        ratelimit: Option<&IrRateLimitService>,
        notices: &mut Notices,
    ) -> Vec<MappingGroup> {
        let mut groups: Vec<MappingGroup> = self
            .pending
            .into_iter()
            .enumerate()
            .map(|(order, (key, members))| finish_group(order, key, members, module, ratelimit, notices))
            .collect();

        // stable: equal priorities keep insertion order
        groups.sort_by(|a, b| b.priority.cmp(&a.priority));
        groups
    }
}

fn finish_group(
    order: usize,
    key: GroupKey,
    members: Vec<IrMapping>,
    module: &IrModule,
    ratelimit: Option<&IrRateLimitService>,
    notices: &mut Notices,
) -> MappingGroup {
    let members = apply_redirect_policy(members, notices);
    let members = if members.iter().any(|m| m.spec.host_redirect) {
        members
    } else {
        apply_weight_budget(members, notices)
    };

    let redirect = members.iter().find(|m| m.spec.host_redirect).map(|m| RedirectTarget {
        host_redirect: m.spec.service.clone(),
        path_redirect: m.spec.path_redirect.clone(),
    });

    let first = &members[0];

    let cors = resolve_cloned(first.cors.as_ref(), module.cors.as_ref(), None)
        .and_then(|cors| cors.policy());

    let rate_limit_labels = ratelimit
        .map(|rls| labels_for_domain(module, &first.spec, &rls.domain))
        .unwrap_or_default();

    let request_headers_to_add: Vec<AddedHeader> =
        members.iter().flat_map(IrMapping::added_headers).collect();

    let clusters = if redirect.is_some() {
        Vec::new()
    } else {
        weighted_clusters(&members)
    };

    MappingGroup {
        order,
        priority: first.spec.priority.unwrap_or(0),
        timeout_ms: first.spec.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        rewrite: first.spec.rewrite.clone().filter(|rewrite| !rewrite.is_empty()),
        host_rewrite: first.spec.host_rewrite.clone(),
        auto_host_rewrite: first.spec.auto_host_rewrite,
        cors,
        rate_limit_labels,
        redirect,
        clusters,
        request_headers_to_add,
        mappings: members,
        key,
    }
}

/// A redirecting group keeps only its first redirect Mapping
fn apply_redirect_policy(members: Vec<IrMapping>, notices: &mut Notices) -> Vec<IrMapping> {
    let Some(winner) = members.iter().position(|m| m.spec.host_redirect) else {
        return members;
    };

    let winner_rkey = members[winner].rkey.clone();
    let mut kept = Vec::with_capacity(1);

    for (position, mapping) in members.into_iter().enumerate() {
        if position == winner {
            kept.push(mapping);
            continue;
        }

        let message = if mapping.spec.host_redirect {
            format!("route already redirects via {}; second redirect ignored", winner_rkey)
        } else {
            format!("route redirects via {}; upstream '{}' dropped", winner_rkey, mapping.spec.service)
        };
        notices.report(NoticeKind::RedirectConflict, mapping.rkey.clone(), message);
    }

    kept
}

/// Explicit weights share a budget of 100; a member whose weight would push
/// the group past it is dropped
fn apply_weight_budget(members: Vec<IrMapping>, notices: &mut Notices) -> Vec<IrMapping> {
    let mut explicit = 0u32;
    let mut kept = Vec::with_capacity(members.len());

    for mapping in members {
        match mapping.spec.weight {
            Some(weight) if explicit + weight > 100 => notices.report(
                NoticeKind::WeightOverflow,
                mapping.rkey.clone(),
                format!(
                    "weight {} would bring the group total to {}; upstream '{}' dropped",
                    weight,
                    explicit + weight,
                    mapping.spec.service
                ),
            ),
            Some(weight) => {
                explicit += weight;
                kept.push(mapping);
            }
            None => kept.push(mapping),
        }
    }

    kept
}

/// Weighted upstreams for a group, always totalling 100
///
/// Members without an explicit weight split what the explicit weights leave
/// of 100 equally; the last of them absorbs the rounding remainder. With no
/// weightless members the last member absorbs any shortfall.
fn weighted_clusters(members: &[IrMapping]) -> Vec<WeightedCluster> {
    let explicit: u32 = members.iter().filter_map(|m| m.spec.weight).sum();
    let weightless = members.iter().filter(|m| m.spec.weight.is_none()).count() as u32;

    let remainder = 100u32.saturating_sub(explicit);
    let share = if weightless > 0 { remainder / weightless } else { 0 };
    let last = members.len().saturating_sub(1);
    let mut seen_weightless = 0;

    members
        .iter()
        .enumerate()
        .map(|(position, mapping)| {
            let weight = match mapping.spec.weight {
                Some(weight) if weightless == 0 && position == last => weight + remainder,
                Some(weight) => weight,
                None => {
                    seen_weightless += 1;
                    if seen_weightless == weightless {
                        remainder - share * (weightless - 1)
                    } else {
                        share
                    }
                }
            };

            let request_headers_to_add = if mapping.add_linkerd_headers {
                vec![AddedHeader {
                    key: LINKERD_HEADER.to_string(),
                    value: mapping.cluster.authority(),
                    append: false,
                }]
            } else {
                Vec::new()
            };

            WeightedCluster { name: mapping.cluster.name.clone(), weight, request_headers_to_add }
        })
        .collect()
}
