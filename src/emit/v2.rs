//! V2 rendering
//!
//! Routes follow the v2 route schema (`match` / `route` / `redirect`),
//! listeners and clusters are nested under `static_resources`.

use super::cluster::Cluster;
use super::listener::{FilterChain, Listener, VirtualHost};
use super::ratelimit_action::RateLimitAction;
use super::route::{format_timeout, Route, RouteAction};
use super::EnvoyConfig;
use crate::errors::Result;
use crate::ir::{AddedHeader, CorsPolicy, SecretInfo};
use serde::Serialize;
use serde_json::{json, Map, Value};

const HCM_FILTER: &str = "envoy.http_connection_manager";
const HCM_TYPE: &str =
    "type.googleapis.com/envoy.config.filter.network.http_connection_manager.v2.HttpConnectionManager";

#[derive(Serialize)]
struct V2Route<'a> {
    #[serde(rename = "match")]
    route_match: V2Match<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<V2RouteAction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<V2Redirect<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    request_headers_to_add: Vec<V2HeaderValueOption<'a>>,
}

#[derive(Serialize)]
struct V2Match<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    regex: Option<&'a str>,
    case_sensitive: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<V2HeaderMatcher<'a>>,
}

#[derive(Serialize)]
struct V2HeaderMatcher<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_match: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    regex_match: Option<&'a str>,
}

#[derive(Serialize)]
struct V2RouteAction<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,
    timeout: String,
    weighted_clusters: V2WeightedClusters<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix_rewrite: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_rewrite: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_host_rewrite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cors: Option<&'a CorsPolicy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rate_limits: Vec<V2RateLimit>,
}

#[derive(Serialize)]
struct V2WeightedClusters<'a> {
    clusters: Vec<V2ClusterWeight<'a>>,
}

#[derive(Serialize)]
struct V2ClusterWeight<'a> {
    name: &'a str,
    weight: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    request_headers_to_add: Vec<V2HeaderValueOption<'a>>,
}

#[derive(Serialize)]
struct V2HeaderValueOption<'a> {
    header: V2HeaderValue<'a>,
    append: bool,
}

#[derive(Serialize)]
struct V2HeaderValue<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct V2RateLimit {
    actions: Vec<Value>,
}

#[derive(Serialize)]
struct V2Redirect<'a> {
    host_redirect: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_redirect: Option<&'a str>,
}

fn header_options(headers: &[AddedHeader]) -> Vec<V2HeaderValueOption<'_>> {
    headers
        .iter()
        .map(|h| V2HeaderValueOption {
            header: V2HeaderValue { key: &h.key, value: &h.value },
            append: h.append,
        })
        .collect()
}

fn action(action: &RateLimitAction) -> Value {
    let body = match action {
        RateLimitAction::GenericKey { descriptor_value } => {
            json!({ "descriptor_value": descriptor_value })
        }
        RateLimitAction::RequestHeaders { header_name, descriptor_key } => {
            json!({ "header_name": header_name, "descriptor_key": descriptor_key })
        }
        _ => json!({}),
    };

    let mut entry = Map::new();
    entry.insert(action.type_name().to_string(), body);
    Value::Object(entry)
}

fn route_view(route: &Route) -> V2Route<'_> {
    let path = &route.route_match.path;
    let is_prefix = path.field() == "prefix";

    let route_match = V2Match {
        prefix: is_prefix.then(|| path.value()),
        regex: (!is_prefix).then(|| path.value()),
        case_sensitive: route.route_match.case_sensitive,
        headers: route
            .route_match
            .headers
            .iter()
            .map(|h| V2HeaderMatcher {
                name: &h.name,
                exact_match: (!h.regex).then_some(h.value.as_str()),
                regex_match: h.regex.then_some(h.value.as_str()),
            })
            .collect(),
    };

    let (action_view, redirect) = match &route.action {
        RouteAction::Forward(forward) => (
            Some(V2RouteAction {
                priority: forward.priority,
                timeout: forward.timeout(),
                weighted_clusters: V2WeightedClusters {
                    clusters: forward
                        .clusters
                        .iter()
                        .map(|c| V2ClusterWeight {
                            name: &c.name,
                            weight: c.weight,
                            request_headers_to_add: header_options(&c.request_headers_to_add),
                        })
                        .collect(),
                },
                prefix_rewrite: forward.prefix_rewrite.as_deref(),
                host_rewrite: forward.host_rewrite.as_deref(),
                auto_host_rewrite: forward.auto_host_rewrite,
                cors: forward.cors.as_ref(),
                rate_limits: forward
                    .rate_limits
                    .iter()
                    .map(|rl| V2RateLimit { actions: rl.actions.iter().map(action).collect() })
                    .collect(),
            }),
            None,
        ),
        RouteAction::Redirect(target) => (
            None,
            Some(V2Redirect {
                host_redirect: &target.host_redirect,
                path_redirect: target.path_redirect.as_deref(),
            }),
        ),
    };

    V2Route {
        route_match,
        route: action_view,
        redirect,
        request_headers_to_add: header_options(&route.request_headers_to_add),
    }
}

/// Render one route
pub fn render_route(route: &Route) -> Result<Value> {
    Ok(serde_json::to_value(route_view(route))?)
}

fn render_secret(secret: &SecretInfo) -> Value {
    let mut params = Map::new();
    if let Some(min) = secret.min_tls_version {
        params.insert("tls_minimum_protocol_version".to_string(), json!(min.protocol_name()));
    }
    if let Some(max) = secret.max_tls_version {
        params.insert("tls_maximum_protocol_version".to_string(), json!(max.protocol_name()));
    }

    let mut common = Map::new();
    common.insert(
        "tls_certificate_sds_secret_configs".to_string(),
        json!([{ "name": format!("{}.{}", secret.secret, secret.namespace) }]),
    );
    if !params.is_empty() {
        common.insert("tls_params".to_string(), Value::Object(params));
    }

    json!({ "common_tls_context": common })
}

fn render_virtual_host(vhost: &VirtualHost) -> Result<Value> {
    let routes = vhost.routes.iter().map(|r| render_route(r)).collect::<Result<Vec<_>>>()?;

    let mut rendered = Map::new();
    rendered.insert("name".to_string(), json!(vhost.name));
    rendered.insert("domains".to_string(), json!(vhost.domains));
    if vhost.require_tls {
        rendered.insert("require_tls".to_string(), json!("ALL"));
    }
    rendered.insert("routes".to_string(), Value::Array(routes));
    Ok(Value::Object(rendered))
}

fn render_filter_chain(listener: &Listener, chain: &FilterChain) -> Result<Value> {
    let virtual_hosts = chain
        .virtual_hosts
        .iter()
        .map(|vh| render_virtual_host(vh))
        .collect::<Result<Vec<_>>>()?;

    let mut http_filters = Vec::new();
    if listener.cors_filter {
        http_filters.push(json!({ "name": "envoy.cors" }));
    }
    if listener.ratelimit_filter {
        http_filters.push(json!({ "name": "envoy.rate_limit" }));
    }
    http_filters.push(json!({ "name": "envoy.router" }));

    let mut hcm = Map::new();
    hcm.insert("@type".to_string(), json!(HCM_TYPE));
    hcm.insert("stat_prefix".to_string(), json!("ingress_http"));
    if !listener.header_case_rules.is_empty() {
        hcm.insert(
            "http_protocol_options".to_string(),
            json!({ "header_key_format": { "custom": { "rules": listener.header_case_rules } } }),
        );
    }
    hcm.insert("http_filters".to_string(), Value::Array(http_filters));
    hcm.insert("route_config".to_string(), json!({ "virtual_hosts": virtual_hosts }));

    let mut rendered = Map::new();
    if !chain.server_names.is_empty() {
        rendered.insert(
            "filter_chain_match".to_string(),
            json!({ "server_names": chain.server_names }),
        );
    }
    if let Some(secret) = &chain.tls {
        rendered.insert("tls_context".to_string(), render_secret(secret));
    }
    rendered.insert(
        "filters".to_string(),
        json!([{ "name": HCM_FILTER, "typed_config": hcm }]),
    );
    Ok(Value::Object(rendered))
}

fn render_listener(listener: &Listener) -> Result<Value> {
    let chains = listener
        .filter_chains
        .iter()
        .map(|chain| render_filter_chain(listener, chain))
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "name": listener.name,
        "address": {
            "socket_address": { "address": listener.address, "port_value": listener.port }
        },
        "filter_chains": chains,
    }))
}

fn render_cluster(cluster: &Cluster) -> Value {
    let mut rendered = Map::new();
    rendered.insert("name".to_string(), json!(cluster.name));
    rendered.insert("connect_timeout".to_string(), json!(format_timeout(cluster.connect_timeout_ms)));
    rendered.insert("type".to_string(), json!("STRICT_DNS"));
    rendered.insert("lb_policy".to_string(), json!("ROUND_ROBIN"));
    rendered.insert(
        "load_assignment".to_string(),
        json!({
            "cluster_name": cluster.name,
            "endpoints": [{
                "lb_endpoints": [{
                    "endpoint": {
                        "address": {
                            "socket_address": {
                                "address": cluster.host,
                                "port_value": cluster.port,
                                "protocol": "TCP"
                            }
                        }
                    }
                }]
            }]
        }),
    );
    if cluster.tls {
        rendered.insert("tls_context".to_string(), json!({}));
    }
    if cluster.proper_case {
        rendered.insert(
            "http_protocol_options".to_string(),
            json!({ "header_key_format": { "proper_case_words": {} } }),
        );
    }
    Value::Object(rendered)
}

/// Render the whole document
pub fn render(config: &EnvoyConfig) -> Result<Value> {
    let routes = config.routes.iter().map(|r| render_route(r)).collect::<Result<Vec<_>>>()?;

    let sni_routes = config
        .sni_routes
        .iter()
        .map(|sni| -> Result<Value> {
            Ok(json!({
                "route": render_route(&sni.route)?,
                "info": { "hosts": sni.info.hosts, "secret_info": sni.info.secret_info },
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    let listeners = config.listeners.iter().map(render_listener).collect::<Result<Vec<_>>>()?;
    let clusters: Vec<Value> = config.clusters.iter().map(|c| render_cluster(c)).collect();

    let mut document = Map::new();
    document.insert("version".to_string(), json!(config.version));
    document.insert("routes".to_string(), Value::Array(routes));
    document.insert("sni_routes".to_string(), Value::Array(sni_routes));
    document.insert(
        "static_resources".to_string(),
        json!({ "listeners": listeners, "clusters": clusters }),
    );
    if let Some(rls) = &config.ratelimit {
        document.insert(
            "ratelimit".to_string(),
            json!({
                "domain": rls.domain,
                "cluster": rls.cluster,
                "timeout": format_timeout(rls.timeout_ms),
            }),
        );
    }

    Ok(Value::Object(document))
}
