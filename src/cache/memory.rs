use std::{
    collections::HashMap,
    sync::RwLock,
    time::{Duration, Instant},
};

use super::CacheStore;
use crate::error::CacheError;

/// Largest value a single entry may hold.
pub const DEFAULT_MAX_VALUE_BYTES: usize = 100 * 1024;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL store. Expired entries are dropped lazily on access.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    max_value_bytes: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_VALUE_BYTES)
    }

    pub fn with_limit(max_value_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_value_bytes,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let guard = self.entries.read().map_err(|_| CacheError::Poisoned)?;
            match guard.get(key) {
                Some(e) if e.expires_at > Instant::now() => return Ok(Some(e.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // expired: drop it under the write lock
        let mut guard = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if guard.get(key).map_or(false, |e| e.expires_at <= Instant::now()) {
            guard.remove(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if value.len() > self.max_value_bytes {
            return Err(CacheError::TooLarge {
                size: value.len(),
                limit: self.max_value_bytes,
            });
        }
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(CacheError::TtlOutOfRange(ttl))?;
        let mut guard = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        guard.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut guard = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}
