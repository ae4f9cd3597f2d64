//! In-memory response cache keyed by request URL.
//!
//! The cache is an explicitly owned object, shared as `Arc<ResponseCache>`
//! between whichever components issue requests. Only bodies of 2xx responses
//! are ever stored. There is no eviction: entries live as long as the cache.

use std::collections::HashMap;
use std::sync::RwLock;

/// Status range whose bodies may be cached.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cache from a previously taken [`snapshot`](Self::snapshot).
    pub fn from_snapshot(entries: HashMap<String, Vec<u8>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the cached body for `url`, if any.
    pub fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(url).cloned()
    }

    /// Stores `body` under `url` when `status` is in the success range.
    ///
    /// Returns `true` if the entry was written.
    pub fn store(&self, url: &str, body: &[u8], status: u16) -> bool {
        if !is_success(status) {
            return false;
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(url.to_string(), body.to_vec());
        tracing::debug!("Cached {} bytes for {}", body.len(), url);
        true
    }

    pub fn invalidate(&self, url: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(url).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, for callers that want to persist the cache.
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }
}
