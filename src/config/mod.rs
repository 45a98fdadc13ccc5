//! # Configuration Management
//!
//! Configuration for the compiler and its logging. Values come from
//! `ROUTEPLANE_*` environment variables ([`Config::from_env`]) or from a
//! TOML/YAML file layered with `ROUTEPLANE__SECTION__KEY` overrides
//! ([`Config::from_file`]).

pub mod settings;

pub use settings::{CompilerConfig, ObservabilityConfig};

use crate::emit::TargetVersion;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

const ENV_PREFIX: &str = "ROUTEPLANE";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Create configuration from environment variables
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a configuration file, then apply `ROUTEPLANE__SECTION__KEY` overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
            )
            .build()
            .map_err(|e| {
                Error::config_with_source(format!("Failed to load {}", path.display()), Box::new(e))
            })?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.compiler.validate()?;
        self.observability.validate()
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", ENV_PREFIX, name));
        let defaults = Config::default();

        let cleartext_port = parse_var(&var, "CLEARTEXT_PORT")?
            .unwrap_or(defaults.compiler.cleartext_port);
        let tls_port = parse_var(&var, "TLS_PORT")?.unwrap_or(defaults.compiler.tls_port);

        let target_version = match var("TARGET_VERSION") {
            Some(raw) => TargetVersion::from_str(&raw)?,
            None => defaults.compiler.target_version,
        };

        let json_logging = var("JSON_LOGGING")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(defaults.observability.json_logging);

        let config = Self {
            compiler: CompilerConfig {
                ambassador_id: var("AMBASSADOR_ID").unwrap_or(defaults.compiler.ambassador_id),
                target_version,
                listen_address: var("LISTEN_ADDRESS").unwrap_or(defaults.compiler.listen_address),
                cleartext_port,
                tls_port,
            },
            observability: ObservabilityConfig {
                log_level: var("LOG_LEVEL").unwrap_or(defaults.observability.log_level),
                json_logging,
                service_name: var("SERVICE_NAME").unwrap_or(defaults.observability.service_name),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F>(var: &F, name: &str) -> Result<Option<u16>>
where
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.parse::<u16>()
                .map_err(|e| Error::config(format!("Invalid {}_{}: {}", ENV_PREFIX, name, e)))
        })
        .transpose()
}
