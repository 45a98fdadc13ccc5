//! Upstream clusters derived from Mapping services

use regex::Regex;
use std::sync::LazyLock;

static CLUSTER_NAME_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]").expect("valid cluster name pattern"));

/// One upstream, shared by every Mapping naming the same service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IrCluster {
    pub name: String,
    pub service: String,
    pub host: String,
    pub port: u16,
    /// Originate TLS to the upstream (`https://` services)
    pub tls: bool,
}

impl IrCluster {
    pub fn from_service(service: &str) -> Self {
        let (tls, rest) = if let Some(rest) = service.strip_prefix("https://") {
            (true, rest)
        } else {
            (false, service.strip_prefix("http://").unwrap_or(service))
        };

        let authority = rest.split('/').next().unwrap_or(rest);
        let default_port = if tls { 443 } else { 80 };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, port),
                Err(_) => (authority, default_port),
            },
            None => (authority, default_port),
        };

        Self {
            name: cluster_name(service),
            service: service.to_string(),
            host: host.to_string(),
            port,
            tls,
        }
    }

    /// `host:port`, the value Linkerd expects in `l5d-dst-override`
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn cluster_name(service: &str) -> String {
    format!("cluster_{}", CLUSTER_NAME_UNSAFE.replace_all(service, "_"))
}
