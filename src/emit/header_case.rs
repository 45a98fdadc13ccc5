//! Header-case override rules

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// RFC 7230 `token`
static HEADER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").expect("valid header name pattern")
});

/// Map lowercased header names to the casing the upstream expects
///
/// Only header-name strings survive; numbers, objects and nested lists are
/// dropped. `proper_case` wins over any override, leaving the map empty.
pub fn build_header_case_rules(candidates: &[Value], proper_case: bool) -> BTreeMap<String, String> {
    if proper_case {
        return BTreeMap::new();
    }

    let mut rules = BTreeMap::new();
    for candidate in candidates {
        let Value::String(name) = candidate else {
            continue;
        };
        if HEADER_NAME.is_match(name) {
            rules.entry(name.to_lowercase()).or_insert_with(|| name.clone());
        }
    }

    rules
}
