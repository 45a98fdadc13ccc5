//! Header-case override rules as they appear on the emitted listeners

mod common;

use common::config;
use routeplane::{compile, Resource, ResourceKind, ResourceSet, TargetVersion};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn module_with_overrides(overrides: Value, proper_case: bool) -> ResourceSet {
    let mut module_config = json!({ "header_case_overrides": overrides });
    if proper_case {
        module_config["proper_case"] = json!(true);
    }

    vec![
        Resource::new(ResourceKind::Module, "default", "ambassador", json!({ "config": module_config })),
        Resource::new(
            ResourceKind::Mapping,
            "default",
            "httpbin",
            json!({ "prefix": "/httpbin/", "service": "httpbin" }),
        ),
    ]
    .into_iter()
    .collect()
}

/// Collect the custom rule map of every HTTP connection manager
fn listener_rules(resources: &ResourceSet) -> Vec<Option<BTreeMap<String, String>>> {
    let snapshot = compile(resources, &config(TargetVersion::V2)).expect("compiles");
    let doc = snapshot.config.as_value().expect("renders");

    let mut found = Vec::new();
    for listener in doc["static_resources"]["listeners"].as_array().unwrap() {
        for chain in listener["filter_chains"].as_array().unwrap() {
            let typed_config = &chain["filters"][0]["typed_config"];
            let rules = typed_config
                .get("http_protocol_options")
                .and_then(|options| options.get("header_key_format"))
                .map(|format| {
                    serde_json::from_value(format["custom"]["rules"].clone()).expect("rule map")
                });
            found.push(rules);
        }
    }
    assert!(!found.is_empty(), "no listeners emitted");
    found
}

fn assert_rules(overrides: Value, expected: &[&str]) {
    let expected: BTreeMap<String, String> =
        expected.iter().map(|h| (h.to_lowercase(), h.to_string())).collect();

    for rules in listener_rules(&module_with_overrides(overrides, false)) {
        assert_eq!(rules.as_ref(), Some(&expected));
    }
}

fn assert_no_rules(overrides: Value, proper_case: bool) {
    for rules in listener_rules(&module_with_overrides(overrides, proper_case)) {
        assert!(rules.is_none(), "unexpected header_key_format: {:?}", rules);
    }
}

#[test]
fn test_empty_or_unusable_overrides_emit_nothing() {
    assert_no_rules(json!([]), false);
    assert_no_rules(json!([{}]), false);
    assert_no_rules(json!([5]), false);
    assert_no_rules(json!("X-NOT-A-LIST"), false);
}

#[test]
fn test_string_overrides_become_rules() {
    assert_rules(json!(["X-ABC"]), &["X-ABC"]);
    assert_rules(json!(["X-foo", "X-ABC-Baz"]), &["X-foo", "X-ABC-Baz"]);
    assert_rules(json!(["x-goOd", "X-alSo-good", "Authorization"]), &["x-goOd", "X-alSo-good", "Authorization"]);
}

#[test]
fn test_mixed_overrides_keep_header_names() {
    assert_rules(json!(["x-good", ["hello"]]), &["x-good"]);
    assert_rules(json!(["X-ABC", "x-foo", 5, {}]), &["X-ABC", "x-foo"]);
}

#[test]
fn test_proper_case_suppresses_custom_rules() {
    assert_no_rules(json!(["My-OPINIONATED-CASING"]), true);
    assert_no_rules(json!([]), true);
    assert_no_rules(json!([{"invalid": "true"}, "X-COOL"]), true);
}

#[test]
fn test_proper_case_moves_to_clusters() {
    let resources = module_with_overrides(json!([]), true);
    let snapshot = compile(&resources, &config(TargetVersion::V2)).unwrap();
    let doc = snapshot.config.as_value().unwrap();

    let cluster = &doc["static_resources"]["clusters"][0];
    assert_eq!(cluster["name"], "cluster_httpbin");
    assert_eq!(
        cluster["http_protocol_options"],
        json!({"header_key_format": {"proper_case_words": {}}})
    );
}

#[test]
fn test_v1_listener_carries_rules() {
    let resources = module_with_overrides(json!(["X-HELLO", "X-FOO-Bar"]), false);
    let snapshot = compile(&resources, &config(TargetVersion::V1)).unwrap();
    let doc = snapshot.config.as_value().unwrap();

    let hcm = &doc["listeners"][0]["filters"][0]["config"];
    assert_eq!(
        hcm["header_key_format"]["custom"]["rules"],
        json!({"x-foo-bar": "X-FOO-Bar", "x-hello": "X-HELLO"})
    );
}
