//! # Structured Logging
//!
//! Logging setup and span macros built on the tracing ecosystem. Every
//! generation runs inside a [`generation_span!`] so that all records emitted
//! while building its IR and document share one `operation_id`.

use crate::config::{CompilerConfig, ObservabilityConfig};
use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Create a tracing span for one compile generation
///
/// ```rust,ignore
/// let span = generation_span!(7);
/// let span = generation_span!(7, resources = set.len());
/// ```
#[macro_export]
macro_rules! generation_span {
    ($generation:expr) => {
        tracing::info_span!(
            "generation",
            generation = $generation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($generation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "generation",
            generation = $generation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a debug span for one emitter pass
#[macro_export]
macro_rules! emit_span {
    ($version:expr) => {
        tracing::debug_span!("emit", version = %$version)
    };
}

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over the configured level. Calling this when a subscriber
/// is already installed (tests, embedding applications) is not an error.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json_logging {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if !installed {
        tracing::debug!("Global subscriber already installed, keeping it");
    }

    Ok(())
}

/// Log the effective compiler configuration
pub fn log_config_info(config: &CompilerConfig) {
    tracing::info!(
        ambassador_id = %config.ambassador_id,
        target_version = %config.target_version,
        listen_address = %config.listen_address,
        cleartext_port = config.cleartext_port,
        tls_port = config.tls_port,
        "routeplane compiler configuration"
    );
}
