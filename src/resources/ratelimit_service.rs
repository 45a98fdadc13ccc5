//! RateLimitService spec

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Domain used when a RateLimitService does not name one
pub const DEFAULT_RATELIMIT_DOMAIN: &str = "ambassador";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RateLimitServiceSpec {
    #[validate(length(min = 1, message = "RateLimitService service cannot be empty"))]
    pub service: String,

    #[serde(default)]
    pub domain: Option<String>,

    #[validate(range(min = 1, max = 60000, message = "timeout_ms must be between 1 and 60000"))]
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RateLimitServiceSpec {
    const DEFAULT_TIMEOUT_MS: u64 = 20;

    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        if matches!(&self.domain, Some(domain) if domain.trim().is_empty()) {
            return Err(Error::validation_field("RateLimitService domain cannot be empty", "domain"));
        }
        Ok(())
    }

    pub fn domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(DEFAULT_RATELIMIT_DOMAIN)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(Self::DEFAULT_TIMEOUT_MS)
    }
}
