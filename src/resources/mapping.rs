//! Mapping spec: one declarative routing rule

use super::cors::CorsSpec;
use crate::errors::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// One rate-limit label entry: an optional descriptor plus request headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitLabelSpec {
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub headers: Vec<String>,
}

/// Value of an `add_request_headers` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddHeaderSpec {
    Value(String),
    Detailed {
        value: String,
        #[serde(default = "AddHeaderSpec::default_append")]
        append: bool,
    },
}

impl AddHeaderSpec {
    fn default_append() -> bool {
        true
    }

    pub fn value(&self) -> &str {
        match self {
            AddHeaderSpec::Value(value) | AddHeaderSpec::Detailed { value, .. } => value,
        }
    }

    pub fn append(&self) -> bool {
        match self {
            AddHeaderSpec::Value(_) => true,
            AddHeaderSpec::Detailed { append, .. } => *append,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MappingSpec {
    #[validate(length(min = 1, message = "Mapping prefix cannot be empty"))]
    pub prefix: String,

    /// Treat `prefix` as a regular expression
    #[serde(default)]
    pub prefix_regex: bool,

    #[serde(default)]
    pub case_sensitive: Option<bool>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub host_regex: bool,

    /// Header name -> exact value
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Header name -> regular expression
    #[serde(default)]
    pub regex_headers: BTreeMap<String, String>,

    #[validate(length(min = 1, message = "Mapping service cannot be empty"))]
    pub service: String,

    /// Prefix rewrite; an empty string disables rewriting
    #[serde(default = "MappingSpec::default_rewrite")]
    pub rewrite: Option<String>,

    #[serde(default)]
    pub host_rewrite: Option<String>,

    #[serde(default)]
    pub auto_host_rewrite: Option<bool>,

    /// Redirect to `service` instead of forwarding
    #[serde(default)]
    pub host_redirect: bool,

    #[serde(default)]
    pub path_redirect: Option<String>,

    #[serde(default)]
    pub priority: Option<i32>,

    #[validate(range(min = 1, message = "Mapping timeout_ms must be positive"))]
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub cors: Option<CorsSpec>,

    #[validate(range(max = 100, message = "Mapping weight must be between 0 and 100"))]
    #[serde(default)]
    pub weight: Option<u32>,

    /// Emitted in key order within one Mapping; groups concatenate in member order
    #[serde(default)]
    pub add_request_headers: BTreeMap<String, AddHeaderSpec>,

    #[serde(default)]
    pub add_linkerd_headers: Option<bool>,

    /// Rate-limit domain -> label entries
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<RateLimitLabelSpec>>,

    /// Legacy label list, registered under the RateLimitService domain
    #[serde(default)]
    pub rate_limits: Vec<RateLimitLabelSpec>,
}

impl MappingSpec {
    fn default_rewrite() -> Option<String> {
        Some("/".to_string())
    }

    /// Field validation plus the rules the derive cannot express
    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        if self.prefix_regex {
            Regex::new(&self.prefix).map_err(|err| {
                Error::validation_field(format!("Invalid prefix regex: {}", err), "prefix")
            })?;
        }

        if let Some(host) = &self.host {
            if host.is_empty() {
                return Err(Error::validation_field("Mapping host cannot be empty", "host"));
            }
            if self.host_regex {
                Regex::new(host).map_err(|err| {
                    Error::validation_field(format!("Invalid host regex: {}", err), "host")
                })?;
            }
        }

        for (name, pattern) in &self.regex_headers {
            Regex::new(pattern).map_err(|err| {
                Error::validation_field(
                    format!("Invalid regex for header '{}': {}", name, err),
                    "regex_headers",
                )
            })?;
        }

        if self.headers.keys().chain(self.regex_headers.keys()).any(|name| name.is_empty()) {
            return Err(Error::validation_field("Header names cannot be empty", "headers"));
        }

        if self.path_redirect.is_some() && !self.host_redirect {
            return Err(Error::validation_field(
                "path_redirect requires host_redirect",
                "path_redirect",
            ));
        }

        Ok(())
    }
}
