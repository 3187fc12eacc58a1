// src/fetch/mod.rs
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, FileCache, MemoryCache};
use crate::config::{Config, SourceKind};
use crate::error::CacheError;
use crate::process::{is_blank_row, map_row, to_string_safe, CanonicalRecord, MapOptions};
use crate::schema::HeaderMap;
use crate::source::{
    CsvSource, SheetData, SheetSource, SheetsAuth, SheetsSource, SpreadsheetLocator,
};

pub mod payload;

pub use payload::{Ack, DebugInfo, ErrorPayload, Meta, Payload};

/// The whole dataset is cached as a single entry under this key.
pub const CACHE_KEY: &str = "all_rows_v1";
/// Serialised payloads above this size are not cached.
pub const MAX_CACHE_BYTES: usize = 90 * 1024;

/// Reads the configured tab, maps it into canonical records, and fronts it with a read-through cache.
pub struct DataFetcher {
    locator: SpreadsheetLocator,
    sheet_name: String,
    ttl: Duration,
    opts: MapOptions,
    source: Arc<dyn SheetSource>,
    cache: Arc<dyn CacheStore>,
}

impl DataFetcher {
    pub fn new(
        config: &Config,
        source: Arc<dyn SheetSource>,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        Ok(Self {
            locator: config.locator()?,
            sheet_name: config.sheet_name.clone(),
            ttl: config.cache_ttl()?,
            opts: MapOptions {
                tz: config.offset()?,
                include_original_headers: config.include_original_headers,
            },
            source,
            cache,
        })
    }

    /// Wire up the source and cache backends named by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source: Arc<dyn SheetSource> = match config.source {
            SourceKind::Csv => Arc::new(CsvSource::new(&config.csv_root)),
            SourceKind::Sheets => {
                let auth = match (&config.access_token, &config.api_key) {
                    (Some(token), _) if !token.trim().is_empty() => {
                        SheetsAuth::Bearer(token.trim().to_string())
                    }
                    (_, Some(key)) if !key.trim().is_empty() => {
                        SheetsAuth::ApiKey(key.trim().to_string())
                    }
                    _ => bail!("the sheets source needs apiKey or accessToken"),
                };
                Arc::new(SheetsSource::new(auth).context("building Google Sheets client")?)
            }
        };
        let cache: Arc<dyn CacheStore> = match &config.cache_dir {
            Some(dir) => Arc::new(
                FileCache::new(dir)
                    .with_context(|| format!("opening cache directory {}", dir.display()))?,
            ),
            None => Arc::new(MemoryCache::new()),
        };
        info!(
            source = ?config.source,
            spreadsheet = %config.locator()?,
            sheet = %config.sheet_name,
            cache_seconds = config.cache_seconds,
            file_cache = config.cache_dir.is_some(),
            "configured fetcher"
        );
        Self::new(config, source, cache)
    }

    /// Serve from cache when possible, otherwise read the sheet and write the result back.
    #[tracing::instrument(level = "info", skip(self), fields(sheet = %self.sheet_name))]
    pub async fn fetch(&self) -> Result<Payload> {
        if let Some(payload) = self.cached() {
            info!(rows = payload.meta.row_count, "cache hit");
            return Ok(payload);
        }

        let payload = self.compute().await?;
        info!(rows = payload.meta.row_count, "fetched from source");
        self.store(&payload);
        Ok(payload)
    }

    /// Read and map the sheet without touching the cache.
    pub async fn compute(&self) -> Result<Payload> {
        let sheet = self
            .source
            .read_sheet(&self.locator, &self.sheet_name)
            .await
            .with_context(|| {
                format!(
                    "reading sheet `{}` from spreadsheet {}",
                    self.sheet_name, self.locator
                )
            })?;
        Ok(self.build_payload(sheet, Utc::now()))
    }

    /// Drop the cached dataset.
    pub fn purge(&self) -> Result<(), CacheError> {
        self.cache.remove(CACHE_KEY)?;
        info!(key = CACHE_KEY, "cache purged");
        Ok(())
    }

    /// Turn a raw tab into the response payload. Rows where every cell is blank are dropped.
    pub fn build_payload(&self, sheet: SheetData, now: DateTime<Utc>) -> Payload {
        let tz = self.opts.tz;
        let mut meta = Meta {
            sheet: sheet.sheet,
            spreadsheet: sheet.spreadsheet,
            row_count: 0,
            fetched_at: now
                .with_timezone(&tz)
                .to_rfc3339_opts(SecondsFormat::Millis, false),
        };
        if sheet.rows.len() < 2 {
            debug!(rows = sheet.rows.len(), "no header or no data rows");
            return Payload::empty(meta);
        }

        let mut rows = sheet.rows.into_iter();
        let headers: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .iter()
            .map(|c| to_string_safe(c, &tz))
            .collect();
        let header_map = HeaderMap::build(&headers);

        let mut skipped = 0usize;
        let data: Vec<CanonicalRecord> = rows
            .filter(|r| {
                let blank = is_blank_row(r);
                skipped += blank as usize;
                !blank
            })
            .map(|r| map_row(&r, &header_map, &headers, &self.opts))
            .collect();
        debug!(mapped = data.len(), skipped, "mapped rows");

        let status = header_map.status();
        let debug = DebugInfo {
            installment_status_column: status.chosen.as_ref().map(|c| c.header.clone()),
            installment_status_index: status.chosen.as_ref().map(|c| c.index),
            installment_candidates: status.candidates.clone(),
            chosen_column: status.chosen.clone(),
            all_headers: headers.clone(),
            sample_data_keys: data.first().map(CanonicalRecord::keys).unwrap_or_default(),
        };
        meta.row_count = data.len();

        Payload {
            success: true,
            meta,
            columns: headers,
            data,
            debug,
        }
    }

    /// A store error or a corrupt entry reads as a miss.
    fn cached(&self) -> Option<Payload> {
        let text = match self.cache.get(CACHE_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "cache read failed; reading source directly");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Best-effort write-through; nothing here can fail the request.
    fn store(&self, payload: &Payload) {
        let text = match serde_json::to_string(payload) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not serialise payload for cache");
                return;
            }
        };
        if text.len() > MAX_CACHE_BYTES {
            warn!(
                bytes = text.len(),
                limit = MAX_CACHE_BYTES,
                "payload too large to cache; skipping"
            );
            return;
        }
        if let Err(e) = self.cache.put(CACHE_KEY, &text, self.ttl) {
            warn!(error = %e, "cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{rows, StaticSource};
    use chrono::TimeZone;

    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Poisoned)
        }
        fn put(&self, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::Poisoned)
        }
        fn remove(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Poisoned)
        }
    }

    fn config() -> Config {
        Config {
            spreadsheet_name: Some("Fees".into()),
            source: SourceKind::Csv,
            time_zone: "+05:30".into(),
            ..Config::default()
        }
    }

    fn scenario_rows() -> Vec<Vec<crate::process::Cell>> {
        rows(&[
            &["RegNo", "Installment_status", "Scheme", "installment_status", "Remaining Amount"],
            &["RG-1", "Fully Paid", "Regular", "Pending", "0"],
            &["", "", "", "", ""],
            &["RG-2", "", "EMI", "", "12,500"],
        ])
    }

    fn fetcher(source: Arc<StaticSource>, cache: Arc<dyn CacheStore>) -> DataFetcher {
        DataFetcher::new(&config(), source, cache).unwrap()
    }

    #[tokio::test]
    async fn maps_rows_and_resolves_status() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let f = fetcher(source, Arc::new(MemoryCache::new()));
        let p = f.fetch().await.unwrap();

        assert!(p.success);
        assert_eq!(p.meta.row_count, 2);
        assert_eq!(p.meta.spreadsheet, "Fees");
        assert_eq!(p.meta.sheet, "Sheet1");
        assert!(p.meta.fetched_at.ends_with("+05:30"));
        assert_eq!(p.columns.len(), 5);

        assert_eq!(p.data[0].reg_no, "RG-1");
        assert_eq!(p.data[0].installment_status, "Fully Paid");
        assert_eq!(p.data[1].reg_no, "RG-2");
        assert_eq!(p.data[1].installment_status, "");
        assert_eq!(p.data[1].scheme, "EMI");
        assert_eq!(p.data[1].remaining_amount, 12500.0);

        assert_eq!(p.debug.installment_status_index, Some(1));
        assert_eq!(p.debug.installment_status_column.as_deref(), Some("Installment_status"));
        assert_eq!(p.debug.installment_candidates.len(), 2);
        assert_eq!(p.debug.chosen_column.as_ref().map(|c| c.index), Some(1));
        assert_eq!(p.debug.sample_data_keys.len(), 18);
        assert_eq!(p.debug.all_headers, p.columns);
    }

    #[tokio::test]
    async fn fewer_than_two_rows_is_empty_and_cached() {
        for raw in [vec![], rows(&[&["RegNo", "Scheme"]])] {
            let source = Arc::new(StaticSource::new(raw));
            let cache = Arc::new(MemoryCache::new());
            let f = fetcher(source.clone(), cache.clone());
            let p = f.fetch().await.unwrap();
            assert!(p.success);
            assert!(p.data.is_empty());
            assert!(p.columns.is_empty());
            assert_eq!(p.meta.row_count, 0);
            assert!(cache.get(CACHE_KEY).unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let f = fetcher(source.clone(), Arc::new(MemoryCache::new()));
        let first = f.fetch().await.unwrap();
        let second = f.fetch().await.unwrap();
        assert_eq!(source.reads(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cached_payload_matches_fresh_computation() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let cache = Arc::new(MemoryCache::new());
        let f = fetcher(source.clone(), cache.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 4, 30, 0).unwrap();
        let sheet = source
            .read_sheet(&SpreadsheetLocator::Name("Fees".into()), "Sheet1")
            .await
            .unwrap();
        let fresh = f.build_payload(sheet, now);
        assert_eq!(fresh.meta.fetched_at, "2024-03-15T10:00:00.000+05:30");

        f.store(&fresh);
        assert_eq!(f.cached(), Some(fresh));
    }

    #[tokio::test]
    async fn purge_forces_refetch() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let f = fetcher(source.clone(), Arc::new(MemoryCache::new()));
        f.fetch().await.unwrap();
        f.purge().unwrap();
        f.fetch().await.unwrap();
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn broken_cache_is_invisible_to_reads() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let f = fetcher(source.clone(), Arc::new(BrokenCache));
        assert_eq!(f.fetch().await.unwrap().meta.row_count, 2);
        assert_eq!(f.fetch().await.unwrap().meta.row_count, 2);
        assert_eq!(source.reads(), 2);
        assert!(f.purge().is_err());
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_a_miss() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let cache = Arc::new(MemoryCache::new());
        cache.put(CACHE_KEY, "{not json", Duration::from_secs(60)).unwrap();
        let f = fetcher(source.clone(), cache);
        assert!(f.fetch().await.unwrap().success);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn oversize_payload_is_not_cached() {
        let mut raw = vec![vec![crate::process::Cell::Text("RegNo".into())]];
        for i in 0..2_000 {
            raw.push(vec![crate::process::Cell::Text(format!("RG-{:05}", i))]);
        }
        let source = Arc::new(StaticSource::new(raw));
        let cache = Arc::new(MemoryCache::with_limit(usize::MAX));
        let f = fetcher(source.clone(), cache.clone());
        f.fetch().await.unwrap();
        assert!(cache.get(CACHE_KEY).unwrap().is_none());
        f.fetch().await.unwrap();
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn missing_spreadsheet_names_the_configured_value() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let cfg = Config {
            spreadsheet_name: Some("Missing Book".into()),
            ..config()
        };
        let f = DataFetcher::new(&cfg, source, Arc::new(MemoryCache::new())).unwrap();
        let err = f.fetch().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Missing Book"));
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_rejected_up_front() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let cfg = Config {
            cache_seconds: u64::MAX,
            ..config()
        };
        assert!(DataFetcher::new(&cfg, source, Arc::new(MemoryCache::new())).is_err());
    }

    #[tokio::test]
    async fn original_headers_on_request() {
        let source = Arc::new(StaticSource::new(scenario_rows()));
        let cfg = Config {
            include_original_headers: true,
            ..config()
        };
        let f = DataFetcher::new(&cfg, source, Arc::new(MemoryCache::new())).unwrap();
        let p = f.fetch().await.unwrap();
        let original = p.data[0].original.as_ref().unwrap();
        assert_eq!(original.get("installment_status").map(String::as_str), Some("Pending"));
        assert_eq!(p.debug.sample_data_keys.last().map(String::as_str), Some("_original"));
    }
}
