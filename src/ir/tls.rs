//! Host and TLS resolution
//!
//! Every Host resolves to at most one [`TlsBinding`] using a fixed
//! precedence: an explicit `tlsContext` link, then an inline `tls` block,
//! then a TLSContext whose `hosts` list names the hostname, then a bare
//! `tlsSecret`. Hostnames are unique after resolution; the first Host to
//! claim a hostname keeps it.

use super::Notices;
use crate::errors::NoticeKind;
use crate::resources::{
    HostSpec, InsecureAction, LabelSelector, Resource, TlsContextSpec, TlsVersion,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Resolved secret reference plus protocol bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretInfo {
    pub secret: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_tls_version: Option<TlsVersion>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tls_version: Option<TlsVersion>,
}

/// Where a binding's TLS material came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSource {
    Context(String),
    Inline,
    ImplicitContext(String),
    Secret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsBinding {
    pub hosts: Vec<String>,
    pub secret_info: SecretInfo,
    pub source: TlsSource,
}

/// What the cleartext listener does for a hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleartextPolicy {
    Route,
    Redirect,
    Reject,
    /// `additionalPort: -1`: no cleartext virtual host at all
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrHost {
    pub rkey: String,
    pub hostname: String,
    pub selector: Option<LabelSelector>,
    pub tls: Option<TlsBinding>,
    pub cleartext: CleartextPolicy,
    /// Created for a TLSContext hostname no Host declared
    pub synthetic: bool,
}

/// A decoded TLSContext
#[derive(Debug, Clone)]
pub struct IrTlsContext {
    pub rkey: String,
    pub name: String,
    pub namespace: String,
    pub spec: TlsContextSpec,
}

impl IrTlsContext {
    pub fn new(resource: &Resource, spec: TlsContextSpec) -> Self {
        Self {
            rkey: resource.rkey(),
            name: resource.meta.name.clone(),
            namespace: resource.meta.namespace.clone(),
            spec,
        }
    }

    fn secret_info(&self, fallback: Option<(&str, &str)>) -> Option<SecretInfo> {
        let (secret, namespace) = match (&self.spec.secret, fallback) {
            (Some(secret), _) => (secret.as_str(), self.namespace.as_str()),
            (None, Some(fallback)) => fallback,
            (None, None) => return None,
        };

        Some(SecretInfo {
            secret: secret.to_string(),
            namespace: namespace.to_string(),
            min_tls_version: self.spec.min_tls_version,
            max_tls_version: self.spec.max_tls_version,
        })
    }

    fn covers(&self, hostname: &str) -> bool {
        self.spec.hosts.iter().any(|host| host.eq_ignore_ascii_case(hostname))
    }
}

/// Resolve one Host against the generation's TLSContexts
pub(crate) fn resolve_host(
    resource: &Resource,
    spec: &HostSpec,
    contexts: &[IrTlsContext],
    notices: &mut Notices,
) -> IrHost {
    let rkey = resource.rkey();
    let host_namespace = resource.meta.namespace.as_str();
    let bare_secret = spec.tls_secret.as_ref().map(|secret| {
        (secret.name.as_str(), secret.namespace.as_deref().unwrap_or(host_namespace))
    });
    let hostname = spec.hostname.to_ascii_lowercase();
    let hosts = vec![hostname.clone()];

    let mut tls = None;

    if let Some(link) = &spec.tls_context {
        let linked = contexts
            .iter()
            .find(|ctx| ctx.name == link.name && ctx.namespace == host_namespace)
            .or_else(|| contexts.iter().find(|ctx| ctx.name == link.name));

        match linked.and_then(|ctx| ctx.secret_info(bare_secret).map(|info| (ctx, info))) {
            Some((ctx, secret_info)) => {
                tls = Some(TlsBinding {
                    hosts: hosts.clone(),
                    secret_info,
                    source: TlsSource::Context(ctx.rkey.clone()),
                })
            }
            None => notices.report(
                NoticeKind::MissingTlsContext,
                rkey.clone(),
                format!("tlsContext '{}' is not defined or has no secret", link.name),
            ),
        }
    }

    if tls.is_none() {
        if let (Some(inline), Some((secret, namespace))) = (&spec.tls, bare_secret) {
            tls = Some(TlsBinding {
                hosts: hosts.clone(),
                secret_info: SecretInfo {
                    secret: secret.to_string(),
                    namespace: namespace.to_string(),
                    min_tls_version: inline.min_tls_version,
                    max_tls_version: inline.max_tls_version,
                },
                source: TlsSource::Inline,
            });
        }
    }

    if tls.is_none() {
        tls = contexts.iter().filter(|ctx| ctx.covers(&hostname)).find_map(|ctx| {
            ctx.secret_info(bare_secret).map(|secret_info| TlsBinding {
                hosts: hosts.clone(),
                secret_info,
                source: TlsSource::ImplicitContext(ctx.rkey.clone()),
            })
        });
    }

    if tls.is_none() {
        tls = bare_secret.map(|(secret, namespace)| TlsBinding {
            hosts: hosts.clone(),
            secret_info: SecretInfo {
                secret: secret.to_string(),
                namespace: namespace.to_string(),
                min_tls_version: None,
                max_tls_version: None,
            },
            source: TlsSource::Secret,
        });
    }

    let insecure = spec.insecure();
    let cleartext = if insecure.and_then(|p| p.additional_port) == Some(-1) {
        CleartextPolicy::Disabled
    } else {
        match insecure.and_then(|p| p.action) {
            Some(InsecureAction::Route) => CleartextPolicy::Route,
            Some(InsecureAction::Redirect) => CleartextPolicy::Redirect,
            Some(InsecureAction::Reject) => CleartextPolicy::Reject,
            None if tls.is_some() => CleartextPolicy::Redirect,
            None => CleartextPolicy::Route,
        }
    };

    IrHost {
        rkey,
        hostname,
        selector: spec.selector.clone(),
        tls,
        cleartext,
        synthetic: false,
    }
}

/// Enforce unique hostnames, then add bindings for TLSContext-only hostnames
pub(crate) fn register_hosts(
    resolved: Vec<IrHost>,
    contexts: &[IrTlsContext],
    notices: &mut Notices,
) -> Vec<IrHost> {
    let mut hosts: Vec<IrHost> = Vec::with_capacity(resolved.len());

    for host in resolved {
        match hosts.iter().find(|existing| existing.hostname == host.hostname) {
            Some(existing) if tls_material(existing) == tls_material(&host) => {
                debug!(
                    hostname = %host.hostname,
                    kept = %existing.rkey,
                    dropped = %host.rkey,
                    "Duplicate Host with identical TLS material"
                );
            }
            Some(existing) => notices.report(
                NoticeKind::HostConflict,
                host.rkey.clone(),
                format!(
                    "hostname '{}' already bound with different TLS material by {}",
                    host.hostname, existing.rkey
                ),
            ),
            None => hosts.push(host),
        }
    }

    let mut claimed: HashSet<String> = hosts.iter().map(|h| h.hostname.clone()).collect();

    for ctx in contexts {
        for hostname in ctx.spec.hosts.iter().map(|host| host.to_ascii_lowercase()) {
            if claimed.contains(&hostname) {
                continue;
            }
            let Some(secret_info) = ctx.secret_info(None) else {
                continue;
            };

            claimed.insert(hostname.clone());
            hosts.push(IrHost {
                rkey: ctx.rkey.clone(),
                hostname: hostname.clone(),
                selector: None,
                tls: Some(TlsBinding {
                    hosts: vec![hostname.clone()],
                    secret_info,
                    source: TlsSource::ImplicitContext(ctx.rkey.clone()),
                }),
                cleartext: CleartextPolicy::Route,
                synthetic: true,
            });
        }
    }

    hosts
}

fn tls_material(host: &IrHost) -> Option<&SecretInfo> {
    host.tls.as_ref().map(|binding| &binding.secret_info)
}
