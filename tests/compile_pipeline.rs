//! End-to-end compilation of YAML manifests into V1 and V2 documents

mod common;

use common::{compile_yaml, config, document, route_prefixes, QOTM};
use routeplane::{compile, Error, ResourceSet, TargetVersion};
use serde_json::json;

#[test]
fn test_identical_input_is_byte_identical() {
    let first = compile_yaml(QOTM, TargetVersion::V2);
    let second = compile_yaml(QOTM, TargetVersion::V2);

    assert_eq!(first.config.as_json().unwrap(), second.config.as_json().unwrap());
    assert_eq!(first.digest, second.digest);
}

#[test]
fn test_v2_routes_are_ordered_and_weighted() {
    let doc = document(QOTM, TargetVersion::V2);
    let routes = &doc["routes"];

    assert_eq!(route_prefixes(routes), vec!["/slow/", "/qotm/"]);

    let slow = &routes[0]["route"];
    assert_eq!(slow["timeout"], "1.500s");
    assert_eq!(slow["priority"], 10);
    assert_eq!(slow["prefix_rewrite"], "/");
    assert_eq!(slow["weighted_clusters"]["clusters"], json!([{"name": "cluster_slow_8080", "weight": 100}]));

    let qotm = &routes[1]["route"];
    assert_eq!(qotm["timeout"], "3.000s");
    assert!(qotm.get("priority").is_none());
    assert_eq!(
        qotm["weighted_clusters"]["clusters"],
        json!([
            {"name": "cluster_qotm", "weight": 90},
            {"name": "cluster_qotm_canary", "weight": 10}
        ])
    );
}

#[test]
fn test_v2_static_resources_carry_listener_and_clusters() {
    let doc = document(QOTM, TargetVersion::V2);
    let resources = &doc["static_resources"];

    let clusters: Vec<&str> = resources["clusters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(clusters, vec!["cluster_slow_8080", "cluster_qotm", "cluster_qotm_canary"]);

    let listeners = resources["listeners"].as_array().unwrap();
    assert_eq!(listeners.len(), 1);
    assert_eq!(listeners[0]["address"]["socket_address"]["port_value"], 8080);

    let hcm = &listeners[0]["filter_chains"][0]["filters"][0]["typed_config"];
    assert_eq!(hcm["http_filters"], json!([{"name": "envoy.router"}]));
    assert_eq!(hcm["route_config"]["virtual_hosts"][0]["domains"], json!(["*"]));
    assert!(hcm.get("http_protocol_options").is_none());
}

#[test]
fn test_v1_document_is_flat() {
    let doc = document(QOTM, TargetVersion::V1);

    assert_eq!(doc["version"], "v1");
    assert!(doc.get("static_resources").is_none());
    assert_eq!(route_prefixes(&doc["routes"]), vec!["/slow/", "/qotm/"]);
    assert_eq!(doc["routes"][0]["timeout"], "1.500s");
    assert_eq!(doc["routes"][1]["weighted_clusters"]["clusters"][0]["weight"], 90);

    let listener = &doc["listeners"][0];
    assert_eq!(listener["address"], "tcp://0.0.0.0:8080");
    assert_eq!(listener["filters"][0]["name"], "http_connection_manager");

    let cluster = &doc["clusters"][0];
    assert_eq!(cluster["hosts"], json!([{"url": "tcp://slow:8080"}]));
    assert_eq!(cluster["lb_type"], "round_robin");
}

#[test]
fn test_redirect_mapping_wins_its_group() {
    let manifest = r#"
---
kind: Mapping
name: backend
prefix: /moved/
service: backend
---
kind: Mapping
name: moved
prefix: /moved/
service: new.example.com
host_redirect: true
path_redirect: /landing
"#;
    let snapshot = compile_yaml(manifest, TargetVersion::V2);
    let doc = snapshot.config.as_value().unwrap();

    let route = &doc["routes"][0];
    assert!(route.get("route").is_none());
    assert_eq!(route["redirect"], json!({"host_redirect": "new.example.com", "path_redirect": "/landing"}));
    assert!(doc["static_resources"]["clusters"].as_array().unwrap().is_empty());
    assert!(snapshot
        .notices
        .iter()
        .any(|n| n.kind == routeplane::NoticeKind::RedirectConflict));
}

#[test]
fn test_invalid_resources_become_notices() {
    let manifest = r#"
---
kind: Mapping
name: good
prefix: /good/
service: good
---
kind: Mapping
name: bad-regex
prefix: "/(unclosed"
prefix_regex: true
service: bad
"#;
    let snapshot = compile_yaml(manifest, TargetVersion::V2);

    assert_eq!(snapshot.config.routes.len(), 1);
    assert_eq!(snapshot.notices.len(), 1);
    assert_eq!(snapshot.notices[0].resource, "bad-regex.default");
}

#[test]
fn test_nothing_usable_is_fatal() {
    let resources = ResourceSet::from_yaml("kind: Mapping\nname: broken\nprefix: /\n").unwrap();
    let err = compile(&resources, &config(TargetVersion::V2)).unwrap_err();

    assert!(matches!(err, Error::NoUsableResources { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_ambassador_id_scopes_resources() {
    let manifest = r#"
---
kind: Mapping
name: edge
prefix: /edge/
service: edge
ambassador_id: [edge, internal]
---
kind: Mapping
name: default
prefix: /default/
service: default
"#;
    let resources = ResourceSet::from_yaml(manifest).unwrap();

    let edge = routeplane::CompilerConfig {
        ambassador_id: "edge".to_string(),
        ..config(TargetVersion::V2)
    };
    let snapshot = compile(&resources, &edge).unwrap();
    let doc = snapshot.config.as_value().unwrap();
    assert_eq!(route_prefixes(&doc["routes"]), vec!["/edge/"]);
    assert!(snapshot.notices.is_empty());

    let snapshot = compile(&resources, &config(TargetVersion::V2)).unwrap();
    let doc = snapshot.config.as_value().unwrap();
    assert_eq!(route_prefixes(&doc["routes"]), vec!["/default/"]);
}
