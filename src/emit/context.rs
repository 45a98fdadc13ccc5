//! Per-generation build context
//!
//! Emitted nodes are registered in an [`ElementTable`] keyed by a digest of
//! their serialized form, so structurally equal nodes are shared through one
//! `Arc` instead of being built twice. A [`BuildContext`] owns the tables for
//! exactly one emission pass and is dropped with it.

use super::cluster::Cluster;
use super::listener::VirtualHost;
use super::route::Route;
use crate::errors::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// De-duplication table for one kind of emitted node
#[derive(Debug)]
pub struct ElementTable<T> {
    kind: &'static str,
    elements: HashMap<String, Arc<T>>,
    hits: usize,
}

impl<T: Serialize> ElementTable<T> {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, elements: HashMap::new(), hits: 0 }
    }

    /// Register `element`, returning the shared copy if an equal one exists
    pub fn save(&mut self, element: T) -> Result<Arc<T>> {
        let key = self.key(&element)?;

        if let Some(existing) = self.elements.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(existing));
        }

        let shared = Arc::new(element);
        self.elements.insert(key, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// How many saves returned an existing element
    pub fn hits(&self) -> usize {
        self.hits
    }

    fn key(&self, element: &T) -> Result<String> {
        let bytes = serde_json::to_vec(element)
            .map_err(|e| Error::from(e).with_context(format!("hashing {} element", self.kind)))?;

        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Mutable state of a single emission pass
#[derive(Debug)]
pub struct BuildContext {
    pub routes: ElementTable<Route>,
    pub clusters: ElementTable<Cluster>,
    pub virtual_hosts: ElementTable<VirtualHost>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            routes: ElementTable::new("route"),
            clusters: ElementTable::new("cluster"),
            virtual_hosts: ElementTable::new("virtual_host"),
        }
    }

    pub fn total_hits(&self) -> usize {
        self.routes.hits() + self.clusters.hits() + self.virtual_hosts.hits()
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}
