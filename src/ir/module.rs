//! Global Module resolution

use super::cors::IrCors;
use super::Notices;
use crate::errors::NoticeKind;
use crate::resources::{ModuleSpec, RateLimitLabelSpec, Resource, GLOBAL_MODULE_NAME};
use serde_json::Value;
use std::collections::BTreeMap;

/// Effective process-wide defaults for one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrModule {
    /// Resource key of the Module these defaults came from, if any
    pub rkey: Option<String>,
    pub cors: Option<IrCors>,
    pub proper_case: bool,
    /// Header-case override candidates; always empty when `proper_case` is set
    pub header_case_candidates: Vec<Value>,
    pub default_label_domain: Option<String>,
    pub default_labels: BTreeMap<String, Vec<RateLimitLabelSpec>>,
    pub add_linkerd_headers: bool,
}

impl IrModule {
    pub fn from_spec(resource: &Resource, spec: &ModuleSpec) -> Self {
        let rkey = resource.rkey();
        let config = &spec.config;

        let header_case_candidates =
            if config.proper_case { Vec::new() } else { config.header_case_candidates() };

        Self {
            cors: config
                .cors
                .clone()
                .map(|cors| IrCors::new("Module", &rkey, &resource.meta.name, cors)),
            proper_case: config.proper_case,
            header_case_candidates,
            default_label_domain: config.default_label_domain.clone(),
            default_labels: config.default_labels.clone(),
            add_linkerd_headers: config.add_linkerd_headers.unwrap_or(false),
            rkey: Some(rkey),
        }
    }

    /// Default label entries registered for `domain`
    pub fn default_labels_for(&self, domain: &str) -> &[RateLimitLabelSpec] {
        self.default_labels.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pick the global Module out of every decoded Module
///
/// Only a Module named `ambassador` carries defaults; the first one wins.
pub(crate) fn resolve_module<'a, I>(modules: I, notices: &mut Notices) -> IrModule
where
    I: IntoIterator<Item = (&'a Resource, ModuleSpec)>,
{
    let mut resolved: Option<IrModule> = None;

    for (resource, spec) in modules {
        if resource.meta.name != GLOBAL_MODULE_NAME {
            notices.report(
                NoticeKind::IgnoredResource,
                resource.rkey(),
                format!("only the '{}' Module is recognized", GLOBAL_MODULE_NAME),
            );
            continue;
        }

        match &resolved {
            Some(existing) => notices.report(
                NoticeKind::DuplicateModule,
                resource.rkey(),
                format!(
                    "'{}' Module already defined by {}",
                    GLOBAL_MODULE_NAME,
                    existing.rkey.as_deref().unwrap_or("?")
                ),
            ),
            None => resolved = Some(IrModule::from_spec(resource, &spec)),
        }
    }

    resolved.unwrap_or_default()
}
