//! Route nodes
//!
//! A [`Route`] is the version-neutral form of one MappingGroup. Renderers
//! for each output version only rename and re-nest its fields.

use super::ratelimit_action::{self, RateLimitAction};
use crate::ir::{
    AddedHeader, CorsPolicy, HeaderMatcher, IrRateLimitService, MappingGroup, PathMatch,
    RedirectTarget, WeightedCluster,
};
use serde::Serialize;

/// Render milliseconds as seconds with three fractional digits
pub fn format_timeout(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSpecifier {
    Prefix(String),
    Regex(String),
}

impl PathSpecifier {
    pub fn field(&self) -> &'static str {
        match self {
            PathSpecifier::Prefix(_) => "prefix",
            PathSpecifier::Regex(_) => "regex",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            PathSpecifier::Prefix(value) | PathSpecifier::Regex(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteMatch {
    pub path: PathSpecifier,
    pub case_sensitive: bool,
    pub headers: Vec<HeaderMatcher>,
}

/// One rate-limit entry on a route
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RateLimit {
    pub actions: Vec<RateLimitAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForwardAction {
    pub priority: Option<i32>,
    pub timeout_ms: u64,
    pub clusters: Vec<WeightedCluster>,
    pub prefix_rewrite: Option<String>,
    pub host_rewrite: Option<String>,
    pub auto_host_rewrite: Option<bool>,
    pub cors: Option<CorsPolicy>,
    /// Empty means no rate-limit block at all
    pub rate_limits: Vec<RateLimit>,
}

impl ForwardAction {
    pub fn timeout(&self) -> String {
        format_timeout(self.timeout_ms)
    }
}

/// A route either forwards to weighted upstreams or redirects, never both
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    Forward(ForwardAction),
    Redirect(RedirectTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    #[serde(rename = "match")]
    pub route_match: RouteMatch,
    pub action: RouteAction,
    pub request_headers_to_add: Vec<AddedHeader>,
}

impl Route {
    /// Build the route for one group
    ///
    /// Rate limits are only considered when a RateLimitService is configured.
    pub fn from_group(group: &MappingGroup, ratelimit: Option<&IrRateLimitService>) -> Self {
        let path = match &group.key.path {
            PathMatch::Prefix(prefix) => PathSpecifier::Prefix(prefix.clone()),
            PathMatch::Regex(pattern) => PathSpecifier::Regex(pattern.clone()),
        };

        let route_match =
            RouteMatch { path, case_sensitive: group.key.case_sensitive, headers: group.headers() };

        let action = match &group.redirect {
            Some(redirect) => RouteAction::Redirect(redirect.clone()),
            None => {
                let rate_limits = match ratelimit {
                    Some(_) => ratelimit_action::build_all(&group.rate_limit_labels)
                        .into_iter()
                        .map(|actions| RateLimit { actions })
                        .collect(),
                    None => Vec::new(),
                };

                RouteAction::Forward(ForwardAction {
                    priority: group.mappings.first().and_then(|m| m.spec.priority),
                    timeout_ms: group.timeout_ms,
                    clusters: group.clusters.clone(),
                    prefix_rewrite: group.rewrite.clone(),
                    host_rewrite: group.host_rewrite.clone(),
                    auto_host_rewrite: group.auto_host_rewrite,
                    cors: group.cors.clone(),
                    rate_limits,
                })
            }
        };

        Self { route_match, action, request_headers_to_add: group.request_headers_to_add.clone() }
    }

    pub fn forward(&self) -> Option<&ForwardAction> {
        match &self.action {
            RouteAction::Forward(forward) => Some(forward),
            RouteAction::Redirect(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<&RedirectTarget> {
        match &self.action {
            RouteAction::Redirect(redirect) => Some(redirect),
            RouteAction::Forward(_) => None,
        }
    }

    pub fn has_cors(&self) -> bool {
        self.forward().is_some_and(|forward| forward.cors.is_some())
    }
}
