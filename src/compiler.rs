//! # Generation Orchestration
//!
//! [`compile`] runs one pass of the pipeline: IR build, emission and digest.
//! [`Compiler`] wraps it for long-running use. Reconciles are serialized,
//! each one owns its input set, and only complete snapshots are published to
//! subscribers.

use crate::config::CompilerConfig;
use crate::emit::{generate, EnvoyConfig, TargetVersion};
use crate::errors::{ConfigNotice, Result};
use crate::generation_span;
use crate::ir::Ir;
use crate::resources::ResourceSet;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// A complete generation as handed to consumers
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub generation: u64,
    pub version: TargetVersion,
    /// Hex SHA-256 of the compact document
    pub digest: String,
    pub generated_at: DateTime<Utc>,
    pub config: Arc<EnvoyConfig>,
    pub notices: Vec<ConfigNotice>,
}

fn build_snapshot(
    generation: u64,
    resources: &ResourceSet,
    config: &CompilerConfig,
) -> Result<ConfigSnapshot> {
    let ir = Ir::build(resources, config)?;
    let document = generate(&ir, config.target_version)?;
    let digest = document.digest()?;

    Ok(ConfigSnapshot {
        generation,
        version: config.target_version,
        digest,
        generated_at: Utc::now(),
        config: Arc::new(document),
        notices: ir.notices,
    })
}

/// Compile a resource set into a snapshot in a single pass
pub fn compile(resources: &ResourceSet, config: &CompilerConfig) -> Result<ConfigSnapshot> {
    let _span = generation_span!(1u64, resources = resources.len()).entered();
    build_snapshot(1, resources, config)
}

/// Serialized compiler publishing snapshots over a watch channel
pub struct Compiler {
    config: CompilerConfig,
    pass: Mutex<()>,
    generation: AtomicU64,
    publisher: watch::Sender<Option<Arc<ConfigSnapshot>>>,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        let (publisher, _) = watch::channel(None);
        Self { config, pass: Mutex::new(()), generation: AtomicU64::new(0), publisher }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Number of the last published generation, 0 before the first
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ConfigSnapshot>>> {
        self.publisher.subscribe()
    }

    pub fn current(&self) -> Option<Arc<ConfigSnapshot>> {
        self.publisher.borrow().clone()
    }

    /// Run one generation over `resources`
    ///
    /// Concurrent calls queue behind each other. When the resulting document
    /// matches the current one byte for byte, the current snapshot is
    /// returned and nothing is published. On error the current snapshot stays
    /// in place.
    pub async fn reconcile(&self, resources: ResourceSet) -> Result<Arc<ConfigSnapshot>> {
        let _guard = self.pass.lock().await;

        let next = self.generation.load(Ordering::Relaxed) + 1;
        let span = generation_span!(next, resources = resources.len());
        let _entered = span.enter();

        let snapshot = match build_snapshot(next, &resources, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Generation failed, keeping current snapshot");
                return Err(e);
            }
        };

        if let Some(current) = self.current() {
            if current.digest == snapshot.digest {
                debug!(digest = %current.digest, "Document unchanged, skipping publish");
                return Ok(current);
            }
        }

        let snapshot = Arc::new(snapshot);
        self.generation.store(next, Ordering::Relaxed);
        self.publisher.send_replace(Some(Arc::clone(&snapshot)));

        info!(
            generation = next,
            version = %snapshot.version,
            digest = %snapshot.digest,
            notices = snapshot.notices.len(),
            "Published configuration"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::resources::{Resource, ResourceKind};
    use serde_json::json;

    fn set(prefix: &str) -> ResourceSet {
        vec![Resource::new(
            ResourceKind::Mapping,
            "default",
            "m",
            json!({"prefix": prefix, "service": "svc"}),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_compile_produces_snapshot() {
        let snapshot = compile(&set("/a/"), &CompilerConfig::default()).unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.version, TargetVersion::V2);
        assert_eq!(snapshot.digest, snapshot.config.digest().unwrap());
        assert!(snapshot.notices.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_publishes_changes_only() {
        let compiler = Compiler::new(CompilerConfig::default());
        let mut rx = compiler.subscribe();
        assert!(compiler.current().is_none());

        let first = compiler.reconcile(set("/a/")).await.unwrap();
        assert_eq!(first.generation, 1);
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        let same = compiler.reconcile(set("/a/")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &same));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(compiler.generation(), 1);

        let changed = compiler.reconcile(set("/b/")).await.unwrap();
        assert_eq!(changed.generation, 2);
        assert_ne!(changed.digest, first.digest);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_failed_reconcile_keeps_current() {
        let compiler = Compiler::new(CompilerConfig::default());
        let first = compiler.reconcile(set("/a/")).await.unwrap();

        let err = compiler.reconcile(ResourceSet::new()).await.unwrap_err();
        assert!(matches!(err, Error::NoUsableResources { .. }));

        let current = compiler.current().unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(compiler.generation(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reconciles_are_serialized() {
        let compiler = Arc::new(Compiler::new(CompilerConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let compiler = Arc::clone(&compiler);
                tokio::spawn(async move { compiler.reconcile(set(&format!("/p{}/", i))).await })
            })
            .collect();

        let mut generations = Vec::new();
        for handle in handles {
            generations.push(handle.await.unwrap().unwrap().generation);
        }
        generations.sort_unstable();

        assert_eq!(generations, (1..=8).collect::<Vec<_>>());
        assert_eq!(compiler.current().unwrap().generation, 8);
    }
}
