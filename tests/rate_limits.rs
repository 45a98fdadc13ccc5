//! Rate-limit labels compiled into route actions

mod common;

use common::{compile_yaml, config, document, RATE_LIMITED};
use proptest::prelude::*;
use routeplane::{compile, Resource, ResourceKind, ResourceSet, TargetVersion};
use serde_json::{json, Value};

#[test]
fn test_labels_become_action_lists() {
    let doc = document(RATE_LIMITED, TargetVersion::V2);
    let rate_limits = &doc["routes"][0]["route"]["rate_limits"];

    assert_eq!(
        rate_limits,
        &json!([
            {"actions": [
                {"source_cluster": {}},
                {"destination_cluster": {}},
                {"remote_address": {}},
                {"generic_key": {"descriptor_value": "global"}}
            ]},
            {"actions": [
                {"source_cluster": {}},
                {"destination_cluster": {}},
                {"remote_address": {}},
                {"generic_key": {"descriptor_value": "per-route"}},
                {"request_headers": {"header_name": "x-user", "descriptor_key": "x-user"}}
            ]}
        ])
    );
}

#[test]
fn test_service_is_carried_in_the_document() {
    let snapshot = compile_yaml(RATE_LIMITED, TargetVersion::V2);
    let doc = snapshot.config.as_value().unwrap();

    assert_eq!(
        doc["ratelimit"],
        json!({"domain": "ambassador", "cluster": "cluster_ratelimit_5000", "timeout": "0.020s"})
    );

    let clusters = doc["static_resources"]["clusters"].as_array().unwrap();
    assert!(clusters.iter().any(|c| c["name"] == "cluster_ratelimit_5000"));

    let filters = &doc["static_resources"]["listeners"][0]["filter_chains"][0]["filters"][0]
        ["typed_config"]["http_filters"];
    assert_eq!(filters, &json!([{"name": "envoy.rate_limit"}, {"name": "envoy.router"}]));
}

#[test]
fn test_v1_actions_are_typed_records() {
    let doc = document(RATE_LIMITED, TargetVersion::V1);

    let actions = &doc["routes"][0]["rate_limits"][1]["actions"];
    assert_eq!(actions[0], json!({"type": "source_cluster"}));
    assert_eq!(
        actions[4],
        json!({"type": "request_headers", "header_name": "x-user", "descriptor_key": "x-user"})
    );
    assert_eq!(
        doc["ratelimit"],
        json!({"domain": "ambassador", "cluster_name": "cluster_ratelimit_5000", "timeout_ms": 20})
    );
}

#[test]
fn test_labels_are_ignored_without_a_service() {
    let manifest = r#"
---
kind: Mapping
name: limited
prefix: /limited/
service: limited
labels:
  ambassador:
    - descriptor: per-route
"#;
    let doc = document(manifest, TargetVersion::V2);
    assert!(doc["routes"][0]["route"].get("rate_limits").is_none());
    assert!(doc.get("ratelimit").is_none());
}

fn labelled(entries: &[(Option<String>, Vec<String>)]) -> ResourceSet {
    let labels: Vec<Value> = entries
        .iter()
        .map(|(descriptor, headers)| json!({"descriptor": descriptor, "headers": headers}))
        .collect();

    vec![
        Resource::new(
            ResourceKind::RateLimitService,
            "default",
            "ratelimit",
            json!({"service": "ratelimit:5000"}),
        ),
        Resource::new(
            ResourceKind::Mapping,
            "default",
            "limited",
            json!({"prefix": "/limited/", "service": "limited", "labels": {"ambassador": labels}}),
        ),
    ]
    .into_iter()
    .collect()
}

fn entry() -> impl Strategy<Value = (Option<String>, Vec<String>)> {
    (
        proptest::option::of("[a-z]{0,8}"),
        proptest::collection::vec("[a-z][a-z0-9-]{0,10}", 0..4),
    )
}

proptest! {
    #[test]
    fn test_action_sequence_follows_label_entries(entries in proptest::collection::vec(entry(), 0..5)) {
        let snapshot = compile(&labelled(&entries), &config(TargetVersion::V2)).unwrap();
        let doc = snapshot.config.as_value().unwrap();
        let rendered = doc["routes"][0]["route"]
            .get("rate_limits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut expected = Vec::new();
        for (descriptor, headers) in &entries {
            let mut actions = vec![
                json!({"source_cluster": {}}),
                json!({"destination_cluster": {}}),
                json!({"remote_address": {}}),
            ];
            if let Some(descriptor) = descriptor.as_deref().filter(|d| !d.is_empty()) {
                actions.push(json!({"generic_key": {"descriptor_value": descriptor}}));
            }
            for header in headers {
                actions.push(json!({"request_headers": {"header_name": header, "descriptor_key": header}}));
            }
            if actions.len() > 3 {
                expected.push(json!({"actions": actions}));
            }
        }

        prop_assert_eq!(rendered, expected);
    }
}
