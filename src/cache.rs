//! Explicit cache for composed layer stacks.
//!
//! Routes registered under a common scope share one composed layer slice
//! instead of rebuilding it per leaf. The cache is an owned service with a
//! defined lifecycle: the registry creates it at startup and it is dropped
//! with the registry at shutdown, never a process-wide singleton.

use std::collections::HashMap;
use std::sync::Arc;

use crate::layer::Layer;

/// Cache of composed layer stacks keyed by scope identity.
#[derive(Default)]
pub struct ChainCache {
    built: HashMap<String, Arc<[Arc<dyn Layer>]>>,
}

impl ChainCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached stack for `key`, building and memoizing it on the
    /// first request.
    pub fn get_or_build<F>(&mut self, key: &str, build: F) -> Arc<[Arc<dyn Layer>]>
    where
        F: FnOnce() -> Vec<Arc<dyn Layer>>,
    {
        if let Some(stack) = self.built.get(key) {
            return stack.clone();
        }
        let stack: Arc<[Arc<dyn Layer>]> = Arc::from(build());
        self.built.insert(key.to_string(), stack.clone());
        stack
    }

    /// Number of distinct scopes cached so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.built.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }

    /// Drop every cached stack.
    pub fn clear(&mut self) {
        self.built.clear();
    }
}
