//! RateLimitService resolution and per-group label candidates

use super::cluster::IrCluster;
use super::module::IrModule;
use super::Notices;
use crate::errors::NoticeKind;
use crate::resources::{MappingSpec, RateLimitLabelSpec, RateLimitServiceSpec, Resource};

/// The rate-limit service used by this generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrRateLimitService {
    pub rkey: String,
    pub domain: String,
    pub timeout_ms: u64,
    pub cluster: IrCluster,
}

impl IrRateLimitService {
    pub fn new(resource: &Resource, spec: &RateLimitServiceSpec) -> Self {
        Self {
            rkey: resource.rkey(),
            domain: spec.domain().to_string(),
            timeout_ms: spec.timeout_ms(),
            cluster: IrCluster::from_service(&spec.service),
        }
    }
}

/// First RateLimitService wins; later ones are reported
pub(crate) fn resolve_ratelimit_service<'a, I>(
    services: I,
    notices: &mut Notices,
) -> Option<IrRateLimitService>
where
    I: IntoIterator<Item = (&'a Resource, RateLimitServiceSpec)>,
{
    let mut resolved: Option<IrRateLimitService> = None;

    for (resource, spec) in services {
        match &resolved {
            Some(existing) => notices.report(
                NoticeKind::DuplicateRateLimitService,
                resource.rkey(),
                format!("RateLimitService already defined by {}", existing.rkey),
            ),
            None => resolved = Some(IrRateLimitService::new(resource, &spec)),
        }
    }

    resolved
}

/// Label entries a Mapping contributes under `domain`
///
/// Module defaults come first, then the Mapping's own labels. Legacy
/// `rate_limits` entries belong to the Module's `default_label_domain`,
/// or to `domain` itself when none is set.
pub fn labels_for_domain(
    module: &IrModule,
    mapping: &MappingSpec,
    domain: &str,
) -> Vec<RateLimitLabelSpec> {
    let mut labels: Vec<RateLimitLabelSpec> = module.default_labels_for(domain).to_vec();

    if let Some(own) = mapping.labels.get(domain) {
        labels.extend(own.iter().cloned());
    }

    let legacy_domain = module.default_label_domain.as_deref().unwrap_or(domain);
    if legacy_domain == domain {
        labels.extend(mapping.rate_limits.iter().cloned());
    }

    labels
}
