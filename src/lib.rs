//! # Routeplane
//!
//! Routeplane compiles declarative gateway resources (Mappings, Hosts,
//! TLSContexts, Modules and a RateLimitService) into a complete Envoy proxy
//! configuration document.
//!
//! ## Architecture
//!
//! ```text
//! Resources → IR Builder → Config Emitter → V1 / V2 document
//!                  ↓              ↓
//!              Notices       Shared elements
//! ```
//!
//! ## Core Components
//!
//! - **Resources**: typed, validated resource specs and manifest decoding
//! - **IR Builder**: groups Mappings into routes, resolves hosts and TLS
//! - **Config Emitter**: routes, clusters, listeners and rate-limit actions
//! - **Compiler**: serialized generations published over a watch channel
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use routeplane::{compile, Config, ResourceSet, Result};
//!
//! fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let resources = ResourceSet::from_yaml(&std::fs::read_to_string("gateway.yaml")?)?;
//!     let snapshot = compile(&resources, &config.compiler)?;
//!     println!("{}", snapshot.config.as_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod emit;
pub mod errors;
pub mod ir;
pub mod observability;
pub mod resources;

// Re-export commonly used types
pub use compiler::{compile, Compiler, ConfigSnapshot};
pub use config::{CompilerConfig, Config, ObservabilityConfig};
pub use emit::{generate, EnvoyConfig, TargetVersion};
pub use errors::{ConfigNotice, Error, NoticeKind, Result};
pub use ir::Ir;
pub use observability::init_logging;
pub use resources::{Resource, ResourceKind, ResourceSet};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
