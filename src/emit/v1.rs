//! V1 rendering
//!
//! Same document as V2 with the older field layout: match and action fields
//! of a route sit side by side, rate-limit actions are `{type: ...}` records,
//! a listener's filter chains collapse into one route config with a list of
//! SSL contexts, and listeners and clusters are top-level.

use super::cluster::Cluster;
use super::listener::Listener;
use super::ratelimit_action::RateLimitAction;
use super::route::{Route, RouteAction};
use super::EnvoyConfig;
use crate::errors::Result;
use crate::ir::{AddedHeader, SecretInfo};
use serde_json::{json, Map, Value};

fn header_list(headers: &[AddedHeader]) -> Value {
    Value::Array(
        headers
            .iter()
            .map(|h| json!({ "key": h.key, "value": h.value, "append": h.append }))
            .collect(),
    )
}

fn action(action: &RateLimitAction) -> Value {
    match action {
        RateLimitAction::GenericKey { descriptor_value } => {
            json!({ "type": action.type_name(), "descriptor_value": descriptor_value })
        }
        RateLimitAction::RequestHeaders { header_name, descriptor_key } => json!({
            "type": action.type_name(),
            "header_name": header_name,
            "descriptor_key": descriptor_key,
        }),
        _ => json!({ "type": action.type_name() }),
    }
}

/// Render one route
pub fn render_route(route: &Route) -> Result<Value> {
    let mut rendered = Map::new();
    let route_match = &route.route_match;

    rendered.insert(route_match.path.field().to_string(), json!(route_match.path.value()));
    rendered.insert("case_sensitive".to_string(), json!(route_match.case_sensitive));
    if !route_match.headers.is_empty() {
        rendered.insert("headers".to_string(), serde_json::to_value(&route_match.headers)?);
    }

    match &route.action {
        RouteAction::Forward(forward) => {
            if let Some(priority) = forward.priority {
                rendered.insert("priority".to_string(), json!(priority));
            }
            rendered.insert("timeout".to_string(), json!(forward.timeout()));

            let clusters: Vec<Value> = forward
                .clusters
                .iter()
                .map(|c| {
                    let mut cluster = Map::new();
                    cluster.insert("name".to_string(), json!(c.name));
                    cluster.insert("weight".to_string(), json!(c.weight));
                    if !c.request_headers_to_add.is_empty() {
                        cluster.insert(
                            "request_headers_to_add".to_string(),
                            header_list(&c.request_headers_to_add),
                        );
                    }
                    Value::Object(cluster)
                })
                .collect();
            rendered.insert("weighted_clusters".to_string(), json!({ "clusters": clusters }));

            if let Some(rewrite) = &forward.prefix_rewrite {
                rendered.insert("prefix_rewrite".to_string(), json!(rewrite));
            }
            if let Some(host) = &forward.host_rewrite {
                rendered.insert("host_rewrite".to_string(), json!(host));
            }
            if let Some(auto) = forward.auto_host_rewrite {
                rendered.insert("auto_host_rewrite".to_string(), json!(auto));
            }
            if let Some(cors) = &forward.cors {
                rendered.insert("cors".to_string(), serde_json::to_value(cors)?);
            }
            if !forward.rate_limits.is_empty() {
                let rate_limits: Vec<Value> = forward
                    .rate_limits
                    .iter()
                    .map(|rl| json!({ "actions": rl.actions.iter().map(action).collect::<Vec<_>>() }))
                    .collect();
                rendered.insert("rate_limits".to_string(), Value::Array(rate_limits));
            }
        }
        RouteAction::Redirect(target) => {
            rendered.insert("host_redirect".to_string(), json!(target.host_redirect));
            if let Some(path) = &target.path_redirect {
                rendered.insert("path_redirect".to_string(), json!(path));
            }
        }
    }

    if !route.request_headers_to_add.is_empty() {
        rendered.insert(
            "request_headers_to_add".to_string(),
            header_list(&route.request_headers_to_add),
        );
    }

    Ok(Value::Object(rendered))
}

fn render_ssl_context(server_names: &[String], secret: &SecretInfo) -> Value {
    let mut context = Map::new();
    context.insert("server_names".to_string(), json!(server_names));
    context.insert("secret".to_string(), json!(format!("{}.{}", secret.secret, secret.namespace)));
    if let Some(min) = secret.min_tls_version {
        context.insert("min_tls_version".to_string(), json!(min.protocol_name()));
    }
    if let Some(max) = secret.max_tls_version {
        context.insert("max_tls_version".to_string(), json!(max.protocol_name()));
    }
    Value::Object(context)
}

fn render_listener(listener: &Listener) -> Result<Value> {
    let mut virtual_hosts = Vec::new();
    for vhost in listener.filter_chains.iter().flat_map(|chain| &chain.virtual_hosts) {
        let routes = vhost.routes.iter().map(|r| render_route(r)).collect::<Result<Vec<_>>>()?;
        let mut rendered = Map::new();
        rendered.insert("name".to_string(), json!(vhost.name));
        rendered.insert("domains".to_string(), json!(vhost.domains));
        if vhost.require_tls {
            rendered.insert("require_ssl".to_string(), json!("all"));
        }
        rendered.insert("routes".to_string(), Value::Array(routes));
        virtual_hosts.push(Value::Object(rendered));
    }

    let mut filters = Vec::new();
    if listener.cors_filter {
        filters.push(json!({ "type": "decoder", "name": "cors", "config": {} }));
    }
    if listener.ratelimit_filter {
        filters.push(json!({ "type": "decoder", "name": "rate_limit", "config": {} }));
    }
    filters.push(json!({ "type": "decoder", "name": "router", "config": {} }));

    let mut hcm = Map::new();
    hcm.insert("codec_type".to_string(), json!("auto"));
    hcm.insert("stat_prefix".to_string(), json!("ingress_http"));
    if !listener.header_case_rules.is_empty() {
        hcm.insert(
            "header_key_format".to_string(),
            json!({ "custom": { "rules": listener.header_case_rules } }),
        );
    }
    hcm.insert("route_config".to_string(), json!({ "virtual_hosts": virtual_hosts }));
    hcm.insert("filters".to_string(), Value::Array(filters));

    let mut rendered = Map::new();
    rendered.insert("name".to_string(), json!(listener.name));
    rendered.insert(
        "address".to_string(),
        json!(format!("tcp://{}:{}", listener.address, listener.port)),
    );

    let ssl_contexts: Vec<Value> = listener
        .filter_chains
        .iter()
        .filter_map(|chain| chain.tls.as_ref().map(|tls| render_ssl_context(&chain.server_names, tls)))
        .collect();
    if !ssl_contexts.is_empty() {
        rendered.insert("ssl_contexts".to_string(), Value::Array(ssl_contexts));
    }

    rendered.insert(
        "filters".to_string(),
        json!([{ "type": "read", "name": "http_connection_manager", "config": hcm }]),
    );
    Ok(Value::Object(rendered))
}

fn render_cluster(cluster: &Cluster) -> Value {
    let mut rendered = Map::new();
    rendered.insert("name".to_string(), json!(cluster.name));
    rendered.insert("connect_timeout_ms".to_string(), json!(cluster.connect_timeout_ms));
    rendered.insert("type".to_string(), json!("strict_dns"));
    rendered.insert("lb_type".to_string(), json!("round_robin"));
    rendered.insert(
        "hosts".to_string(),
        json!([{ "url": format!("tcp://{}:{}", cluster.host, cluster.port) }]),
    );
    if cluster.tls {
        rendered.insert("ssl_context".to_string(), json!({}));
    }
    if cluster.proper_case {
        rendered.insert("header_key_format".to_string(), json!("proper_case_words"));
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
    document.insert("listeners".to_string(), Value::Array(listeners));
    document.insert("clusters".to_string(), Value::Array(clusters));
    if let Some(rls) = &config.ratelimit {
        document.insert(
            "ratelimit".to_string(),
            json!({
                "domain": rls.domain,
                "cluster_name": rls.cluster,
                "timeout_ms": rls.timeout_ms,
            }),
        );
    }

    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::route::{ForwardAction, PathSpecifier, RateLimit, RouteMatch};
    use crate::ir::{HeaderMatcher, RedirectTarget, WeightedCluster};

    fn route(action: RouteAction) -> Route {
        Route {
            route_match: RouteMatch {
                path: PathSpecifier::Regex("^/v[12]/".to_string()),
                case_sensitive: false,
                headers: vec![HeaderMatcher { name: "x-v".into(), value: "1".into(), regex: false }],
            },
            action,
            request_headers_to_add: vec![],
        }
    }

    #[test]
    fn test_renders_flat_forward_route() {
        let rendered = render_route(&route(RouteAction::Forward(ForwardAction {
            priority: Some(2),
            timeout_ms: 3000,
            clusters: vec![WeightedCluster {
                name: "cluster_a".into(),
                weight: 100,
                request_headers_to_add: vec![],
            }],
            prefix_rewrite: None,
            host_rewrite: None,
            auto_host_rewrite: None,
            cors: None,
            rate_limits: vec![RateLimit {
                actions: vec![
                    RateLimitAction::RemoteAddress,
                    RateLimitAction::RequestHeaders {
                        header_name: "x-user".into(),
                        descriptor_key: "x-user".into(),
                    },
                ],
            }],
        })))
        .unwrap();

        assert_eq!(rendered["regex"], "^/v[12]/");
        assert_eq!(rendered["case_sensitive"], false);
        assert_eq!(rendered["headers"], json!([{"name": "x-v", "value": "1", "regex": false}]));
        assert_eq!(rendered["priority"], 2);
        assert_eq!(rendered["timeout"], "3.000s");
        assert_eq!(
            rendered["rate_limits"][0]["actions"],
            json!([
                {"type": "remote_address"},
                {"type": "request_headers", "header_name": "x-user", "descriptor_key": "x-user"}
            ])
        );
        assert!(rendered.get("match").is_none());
        assert!(rendered.get("prefix_rewrite").is_none());
    }

    #[test]
    fn test_renders_flat_redirect() {
        let rendered = render_route(&route(RouteAction::Redirect(RedirectTarget {
            host_redirect: "other.example.com".into(),
            path_redirect: Some("/moved".into()),
        })))
        .unwrap();

        assert_eq!(rendered["host_redirect"], "other.example.com");
        assert_eq!(rendered["path_redirect"], "/moved");
        assert!(rendered.get("weighted_clusters").is_none());
    }
}
