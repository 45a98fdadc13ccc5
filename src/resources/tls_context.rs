//! TLSContext spec: a reusable bundle of TLS parameters

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// TLS protocol versions, ordered oldest to newest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "v1.0")]
    V1_0,
    #[serde(rename = "v1.1")]
    V1_1,
    #[serde(rename = "v1.2")]
    V1_2,
    #[serde(rename = "v1.3")]
    V1_3,
}

impl TlsVersion {
    /// Name used by the data plane's TLS parameters
    pub fn protocol_name(&self) -> &'static str {
        match self {
            TlsVersion::V1_0 => "TLSv1_0",
            TlsVersion::V1_1 => "TLSv1_1",
            TlsVersion::V1_2 => "TLSv1_2",
            TlsVersion::V1_3 => "TLSv1_3",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TlsVersion::V1_0 => "v1.0",
            TlsVersion::V1_1 => "v1.1",
            TlsVersion::V1_2 => "v1.2",
            TlsVersion::V1_3 => "v1.3",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsContextSpec {
    /// Secret name, resolved in the TLSContext's namespace
    #[serde(default)]
    pub secret: Option<String>,

    /// Hostnames this context claims explicitly
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub min_tls_version: Option<TlsVersion>,

    #[serde(default)]
    pub max_tls_version: Option<TlsVersion>,
}

impl TlsContextSpec {
    pub fn check(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_tls_version, self.max_tls_version) {
            if min > max {
                return Err(Error::validation_field(
                    format!("min_tls_version {} exceeds max_tls_version {}", min, max),
                    "min_tls_version",
                ));
            }
        }

        if self.hosts.iter().any(|host| host.trim().is_empty()) {
            return Err(Error::validation_field("TLSContext hosts cannot be empty", "hosts"));
        }

        if matches!(&self.secret, Some(secret) if secret.trim().is_empty()) {
            return Err(Error::validation_field("TLSContext secret cannot be empty", "secret"));
        }

        Ok(())
    }
}
