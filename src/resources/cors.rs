//! CORS block shared by Mapping and Module specs

use serde::{Deserialize, Serialize};

/// A value that may be written as a comma-separated string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Flatten into trimmed, non-empty entries
    pub fn to_vec(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            StringOrList::One(value) => value.split(',').collect(),
            StringOrList::Many(values) => values.iter().flat_map(|v| v.split(',')).collect(),
        };

        raw.into_iter().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
    }
}

/// `max_age` accepts either seconds or a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxAge {
    Seconds(u64),
    Text(String),
}

impl MaxAge {
    pub fn as_string(&self) -> String {
        match self {
            MaxAge::Seconds(seconds) => seconds.to_string(),
            MaxAge::Text(text) => text.trim().to_string(),
        }
    }
}

/// User-facing CORS configuration
///
/// Unknown keys are accepted and ignored so that bookkeeping fields copied
/// around by other tooling never reach the emitted policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsSpec {
    #[serde(default)]
    pub origins: Option<StringOrList>,
    #[serde(default)]
    pub methods: Option<StringOrList>,
    #[serde(default)]
    pub headers: Option<StringOrList>,
    #[serde(default)]
    pub exposed_headers: Option<StringOrList>,
    #[serde(default)]
    pub credentials: Option<bool>,
    #[serde(default)]
    pub max_age: Option<MaxAge>,
}
