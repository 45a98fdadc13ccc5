//! Listener nodes
//!
//! Two listeners at most: a TLS listener with one filter chain per TLS
//! binding, and a cleartext listener with one virtual host per Host that
//! still accepts cleartext. SNI routes only appear under their own
//! hostnames; every other route appears in every virtual host.

use super::context::BuildContext;
use super::header_case::build_header_case_rules;
use super::route::Route;
use crate::errors::Result;
use crate::ir::{CleartextPolicy, Ir, SecretInfo, SniInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Domain used when no Host is declared
pub const WILDCARD_DOMAIN: &str = "*";

/// A route in emission order, with its SNI binding if it has one
#[derive(Debug, Clone)]
pub struct PlacedRoute {
    pub route: Arc<Route>,
    pub sni: Option<SniInfo>,
}

impl PlacedRoute {
    fn serves(&self, hostname: &str) -> bool {
        match &self.sni {
            Some(info) => info.hosts.iter().any(|host| host == hostname),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    /// Redirect every cleartext request to HTTPS
    pub require_tls: bool,
    pub routes: Vec<Arc<Route>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChain {
    pub server_names: Vec<String>,
    pub tls: Option<SecretInfo>,
    pub virtual_hosts: Vec<Arc<VirtualHost>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listener {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub filter_chains: Vec<FilterChain>,
    /// Lowercased header name to emitted casing; empty means no override field
    pub header_case_rules: BTreeMap<String, String>,
    pub cors_filter: bool,
    pub ratelimit_filter: bool,
}

impl Listener {
    fn new(ir: &Ir, port: u16, filter_chains: Vec<FilterChain>, placed: &[PlacedRoute]) -> Self {
        Self {
            name: format!("ambassador-listener-{}", port),
            address: ir.listen_address.clone(),
            port,
            filter_chains,
            header_case_rules: build_header_case_rules(
                &ir.module.header_case_candidates,
                ir.module.proper_case,
            ),
            cors_filter: placed.iter().any(|p| p.route.has_cors()),
            ratelimit_filter: ir.ratelimit.is_some(),
        }
    }

    pub fn is_tls(&self) -> bool {
        self.filter_chains.iter().any(|chain| chain.tls.is_some())
    }
}

/// Build the TLS and cleartext listeners for a generation
pub fn build_listeners(
    ir: &Ir,
    placed: &[PlacedRoute],
    context: &mut BuildContext,
) -> Result<Vec<Listener>> {
    let mut listeners = Vec::with_capacity(2);

    let mut tls_chains = Vec::new();
    for (host, binding) in ir.tls_hosts() {
        let virtual_host = context.virtual_hosts.save(VirtualHost {
            name: host.hostname.clone(),
            domains: vec![host.hostname.clone()],
            require_tls: false,
            routes: routes_for(&host.hostname, placed),
        })?;

        tls_chains.push(FilterChain {
            server_names: binding.hosts.clone(),
            tls: Some(binding.secret_info.clone()),
            virtual_hosts: vec![virtual_host],
        });
    }

    if !tls_chains.is_empty() {
        listeners.push(Listener::new(ir, ir.tls_port, tls_chains, placed));
    }

    let mut cleartext_hosts = Vec::new();
    // hostnames taken from TLSContexts alone do not replace the wildcard
    if ir.hosts.iter().all(|host| host.synthetic) {
        cleartext_hosts.push(context.virtual_hosts.save(VirtualHost {
            name: WILDCARD_DOMAIN.to_string(),
            domains: vec![WILDCARD_DOMAIN.to_string()],
            require_tls: false,
            routes: placed.iter().map(|p| Arc::clone(&p.route)).collect(),
        })?);
    }

    for host in &ir.hosts {
        let (require_tls, routes) = match host.cleartext {
            CleartextPolicy::Disabled => {
                debug!(hostname = %host.hostname, "Cleartext disabled for host");
                continue;
            }
            CleartextPolicy::Route => (false, routes_for(&host.hostname, placed)),
            CleartextPolicy::Redirect => (true, routes_for(&host.hostname, placed)),
            CleartextPolicy::Reject => (false, Vec::new()),
        };

        cleartext_hosts.push(context.virtual_hosts.save(VirtualHost {
            name: host.hostname.clone(),
            domains: vec![host.hostname.clone()],
            require_tls,
            routes,
        })?);
    }

    if !cleartext_hosts.is_empty() {
        let chain =
            FilterChain { server_names: Vec::new(), tls: None, virtual_hosts: cleartext_hosts };
        listeners.push(Listener::new(ir, ir.cleartext_port, vec![chain], placed));
    }

    Ok(listeners)
}

fn routes_for(hostname: &str, placed: &[PlacedRoute]) -> Vec<Arc<Route>> {
    placed.iter().filter(|p| p.serves(hostname)).map(|p| Arc::clone(&p.route)).collect()
}
