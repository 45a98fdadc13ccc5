//! Non-fatal configuration notices
//!
//! A notice records a resource or derived construct that was skipped or
//! resolved by policy. Notices are logged when reported and travel with the
//! IR and the published snapshot so callers can surface them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a non-fatal configuration problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Resource failed to decode or validate and was skipped
    InvalidResource,
    /// Resource was understood but deliberately not used
    IgnoredResource,
    /// Two Hosts declare the same hostname with divergent TLS material
    HostConflict,
    /// A mapping group mixes a redirect with forwarding routes
    RedirectConflict,
    /// More than one global Module
    DuplicateModule,
    /// More than one RateLimitService
    DuplicateRateLimitService,
    /// A Host links a TLSContext that does not exist
    MissingTlsContext,
    /// Explicit weights in a group exceed 100
    WeightOverflow,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoticeKind::InvalidResource => "invalid_resource",
            NoticeKind::IgnoredResource => "ignored_resource",
            NoticeKind::HostConflict => "host_conflict",
            NoticeKind::RedirectConflict => "redirect_conflict",
            NoticeKind::DuplicateModule => "duplicate_module",
            NoticeKind::DuplicateRateLimitService => "duplicate_ratelimit_service",
            NoticeKind::MissingTlsContext => "missing_tls_context",
            NoticeKind::WeightOverflow => "weight_overflow",
        };
        f.write_str(name)
    }
}

/// A reported, non-fatal configuration warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigNotice {
    pub kind: NoticeKind,
    /// Identity (`name.namespace`) of the resource the notice is about
    pub resource: String,
    pub message: String,
}

impl ConfigNotice {
    pub fn new<R: Into<String>, M: Into<String>>(kind: NoticeKind, resource: R, message: M) -> Self {
        Self { kind, resource: resource.into(), message: message.into() }
    }
}

impl fmt::Display for ConfigNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.resource, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display_includes_kind_and_resource() {
        let notice = ConfigNotice::new(
            NoticeKind::HostConflict,
            "host-2.default",
            "hostname foo.example.com already bound",
        );
        assert_eq!(
            notice.to_string(),
            "[host_conflict] host-2.default: hostname foo.example.com already bound"
        );
    }
}
