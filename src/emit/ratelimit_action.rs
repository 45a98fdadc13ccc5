//! Rate-limit action lists
//!
//! Each rate-limit label entry becomes one ordered action list. Lists always
//! open with the fixed `source_cluster`, `destination_cluster`,
//! `remote_address` triple; a list made of nothing else buckets every request
//! identically and is treated as absent.

use crate::resources::RateLimitLabelSpec;
use serde::{Deserialize, Serialize};

/// One bucketing clause of a rate-limit descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    SourceCluster,
    DestinationCluster,
    RemoteAddress,
    GenericKey { descriptor_value: String },
    RequestHeaders { header_name: String, descriptor_key: String },
}

impl RateLimitAction {
    pub const FIXED: [RateLimitAction; 3] = [
        RateLimitAction::SourceCluster,
        RateLimitAction::DestinationCluster,
        RateLimitAction::RemoteAddress,
    ];

    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            RateLimitAction::SourceCluster
                | RateLimitAction::DestinationCluster
                | RateLimitAction::RemoteAddress
        )
    }

    /// Action type name shared by both output versions
    pub fn type_name(&self) -> &'static str {
        match self {
            RateLimitAction::SourceCluster => "source_cluster",
            RateLimitAction::DestinationCluster => "destination_cluster",
            RateLimitAction::RemoteAddress => "remote_address",
            RateLimitAction::GenericKey { .. } => "generic_key",
            RateLimitAction::RequestHeaders { .. } => "request_headers",
        }
    }
}

/// An ordered action list plus whether it is usable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionList {
    pub actions: Vec<RateLimitAction>,
    pub valid: bool,
}

/// Build the action list for one label entry
pub fn build(label: &RateLimitLabelSpec) -> ActionList {
    let mut actions = RateLimitAction::FIXED.to_vec();

    if let Some(descriptor) = label.descriptor.as_deref().filter(|d| !d.is_empty()) {
        actions.push(RateLimitAction::GenericKey { descriptor_value: descriptor.to_string() });
    }

    actions.extend(label.headers.iter().map(|header| RateLimitAction::RequestHeaders {
        header_name: header.clone(),
        descriptor_key: header.clone(),
    }));

    let valid = actions.iter().any(|action| !action.is_fixed());
    ActionList { actions, valid }
}

/// Action lists for every usable label entry, in label order
pub fn build_all(labels: &[RateLimitLabelSpec]) -> Vec<Vec<RateLimitAction>> {
    labels.iter().map(build).filter(|list| list.valid).map(|list| list.actions).collect()
}
