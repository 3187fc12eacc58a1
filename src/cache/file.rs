use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;
use tracing::debug;

use super::CacheStore;
use crate::error::CacheError;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    expires_at_ms: i64,
    value: String,
}

/// TTL store backed by one JSON file per key, so entries survive restarts
/// and can be shared between processes on the same host.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

fn expiry_ms(now_ms: i64, ttl: Duration) -> Result<i64, CacheError> {
    i64::try_from(ttl.as_millis())
        .ok()
        .and_then(|ms| now_ms.checked_add(ms))
        .ok_or(CacheError::TtlOutOfRange(ttl))
}

fn remove_if_present(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope = serde_json::from_str(&text)?;
        if envelope.expires_at_ms <= Utc::now().timestamp_millis() {
            debug!(key, "file cache entry expired");
            remove_if_present(&path)?;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let envelope = Envelope {
            expires_at_ms: expiry_ms(Utc::now().timestamp_millis(), ttl)?,
            value: value.to_string(),
        };
        let final_path = self.path_for(key);

        // each writer gets its own temp file; the rename is what readers observe
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&serde_json::to_vec(&envelope)?)?;
        tmp.persist(&final_path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        remove_if_present(&self.path_for(key))
    }
}
