//! # Observability
//!
//! Structured logging for the compiler. Output is plain `tracing`; the
//! embedding process decides whether to install [`init_logging`] or its own
//! subscriber.

pub mod logging;

pub use logging::{init_logging, log_config_info};
