// src/cache/mod.rs
use std::time::Duration;

use crate::error::CacheError;

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

/// An opaque key-value store with per-entry TTL.
///
/// Every operation is best effort: callers on the read path log failures and
/// carry on as if the entry were absent.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}
