//! Per-resource connection cache, one live handle per key for the process.

use std::sync::Arc;

use dashmap::DashMap;
use lambda_runtime::tracing;

use crate::error::{ServiceError, ServiceResult};

/// Process-wide map of resource key to lazily-built handle.
#[derive(Debug)]
pub struct ConnectionCache<H> {
    resource: &'static str,
    inner: DashMap<String, Arc<H>>,
}

impl<H> ConnectionCache<H> {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            inner: DashMap::new(),
        }
    }

    /// Builds under the shard lock for `key`; `connect` must not touch this cache.
    pub fn get_or_create<F>(&self, key: &str, connect: F) -> ServiceResult<Arc<H>>
    where
        F: FnOnce(&str) -> H,
    {
        if key.trim().is_empty() {
            return Err(ServiceError::Config(format!(
                "{} must be provided",
                self.resource
            )));
        }

        if let Some(handle) = self.inner.get(key) {
            return Ok(Arc::clone(handle.value()));
        }

        let handle = self.inner.entry(key.to_string()).or_insert_with(|| {
            tracing::info!(resource = self.resource, key, "connection initialized");
            Arc::new(connect(key))
        });
        Ok(Arc::clone(&handle))
    }

    /// Drop the cached handle for `key`. References already handed out stay valid.
    pub fn clear(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        if removed {
            tracing::info!(resource = self.resource, key, "connection cleared");
        }
        removed
    }

    pub fn clear_all(&self) {
        self.inner.clear();
        tracing::info!(resource = self.resource, "all connections cleared");
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
