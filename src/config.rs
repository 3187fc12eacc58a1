use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::process::date_parser::parse_offset;
use crate::source::SpreadsheetLocator;

/// Longest accepted `cacheSeconds` (six hours).
pub const MAX_CACHE_SECONDS: u64 = 6 * 60 * 60;

/// Which backend serves the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sheets,
    Csv,
}

/// Static service configuration, loaded once and handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Preferred resolver.
    pub spreadsheet_id: Option<String>,
    /// Fallback resolver: exact name lookup, first match.
    pub spreadsheet_name: Option<String>,
    pub sheet_name: String,
    pub cache_seconds: u64,
    /// Attach a raw header → value map to every record.
    pub include_original_headers: bool,
    /// Offset dates are rendered in, e.g. `+05:30`.
    pub time_zone: String,
    pub source: SourceKind,
    pub csv_root: PathBuf,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// File cache directory; the in-memory cache is used when unset.
    pub cache_dir: Option<PathBuf>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            spreadsheet_name: None,
            sheet_name: "Sheet1".to_string(),
            cache_seconds: 300,
            include_original_headers: false,
            time_zone: "+00:00".to_string(),
            source: SourceKind::Sheets,
            csv_root: PathBuf::from("data"),
            api_key: None,
            access_token: None,
            cache_dir: None,
            port: 8080,
        }
    }
}

impl Config {
    /// Load from an optional YAML file, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|k| env::var(k).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override fields from environment variables; `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPREADSHEET_ID") {
            self.spreadsheet_id = Some(v);
        }
        if let Some(v) = lookup("SPREADSHEET_NAME") {
            self.spreadsheet_name = Some(v);
        }
        if let Some(v) = lookup("SHEET_NAME") {
            self.sheet_name = v;
        }
        if let Some(v) = lookup("CACHE_SECONDS") {
            self.cache_seconds = v
                .trim()
                .parse()
                .with_context(|| format!("CACHE_SECONDS is not a number: {}", v))?;
        }
        if let Some(v) = lookup("INCLUDE_ORIGINAL_HEADERS") {
            self.include_original_headers = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(v) = lookup("TIME_ZONE") {
            self.time_zone = v;
        }
        if let Some(v) = lookup("SHEET_SOURCE") {
            self.source = match v.trim().to_ascii_lowercase().as_str() {
                "sheets" => SourceKind::Sheets,
                "csv" => SourceKind::Csv,
                other => bail!("SHEET_SOURCE must be `sheets` or `csv`, got `{}`", other),
            };
        }
        if let Some(v) = lookup("CSV_ROOT") {
            self.csv_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("GOOGLE_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("GOOGLE_ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = lookup("CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PORT") {
            self.port = v
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", v))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.locator()?;
        if self.sheet_name.trim().is_empty() {
            bail!("sheetName must not be empty");
        }
        self.offset()?;
        self.cache_ttl()?;
        if self.source == SourceKind::Sheets
            && non_empty(&self.api_key).is_none()
            && non_empty(&self.access_token).is_none()
        {
            bail!("the sheets source needs apiKey or accessToken");
        }
        Ok(())
    }

    /// `spreadsheetId` wins over `spreadsheetName` when both are set.
    pub fn locator(&self) -> Result<SpreadsheetLocator> {
        if let Some(id) = non_empty(&self.spreadsheet_id) {
            return Ok(SpreadsheetLocator::Id(id.to_string()));
        }
        if let Some(name) = non_empty(&self.spreadsheet_name) {
            return Ok(SpreadsheetLocator::Name(name.to_string()));
        }
        bail!("neither spreadsheetId nor spreadsheetName is configured")
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.time_zone).with_context(|| {
            format!(
                "timeZone `{}` is not a UTC offset like +05:30",
                self.time_zone
            )
        })
    }

    pub fn cache_ttl(&self) -> Result<Duration> {
        if self.cache_seconds > MAX_CACHE_SECONDS {
            bail!(
                "cacheSeconds {} exceeds the maximum of {}",
                self.cache_seconds,
                MAX_CACHE_SECONDS
            );
        }
        Ok(Duration::from_secs(self.cache_seconds))
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
