//! Configuration settings and validation

use crate::emit::TargetVersion;
use crate::errors::{Error, Result};
use crate::resources::DEFAULT_AMBASSADOR_ID;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Compiler configuration: which resources participate and how the output is shaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CompilerConfig {
    /// Only resources scoped to this id take part in a generation
    #[validate(length(min = 1, message = "ambassador_id cannot be empty"))]
    pub ambassador_id: String,

    /// Output schema version
    pub target_version: TargetVersion,

    /// Address the emitted listeners bind to
    #[validate(length(min = 1, message = "Listen address cannot be empty"))]
    pub listen_address: String,

    /// Port of the cleartext listener
    #[validate(range(min = 1, max = 65535, message = "Cleartext port must be between 1 and 65535"))]
    pub cleartext_port: u16,

    /// Port of the TLS listener
    #[validate(range(min = 1, max = 65535, message = "TLS port must be between 1 and 65535"))]
    pub tls_port: u16,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            ambassador_id: DEFAULT_AMBASSADOR_ID.to_string(),
            target_version: TargetVersion::V2,
            listen_address: "0.0.0.0".to_string(),
            cleartext_port: 8080,
            tls_port: 8443,
        }
    }
}

impl CompilerConfig {
    /// Validate field ranges and cross-field rules
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        if self.cleartext_port == self.tls_port {
            return Err(Error::validation_field(
                "Cleartext and TLS ports cannot be the same",
                "tls_port",
            ));
        }

        if self.listen_address.trim() != self.listen_address {
            return Err(Error::validation_field(
                "Listen address cannot contain surrounding whitespace",
                "listen_address",
            ));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            service_name: crate::APP_NAME.to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)
    }
}
