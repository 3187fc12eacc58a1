use thiserror::Error;

/// Failures raised while resolving or reading the backing spreadsheet.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{0}")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unexpected response from data source: {0}")]
    Malformed(String),
}

/// Failures from a cache store. Callers on the read path are expected to log and ignore these.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Value of {size} bytes exceeds cache limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("TTL of {0:?} is out of range")]
    TtlOutOfRange(std::time::Duration),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt cache entry: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cache lock poisoned")]
    Poisoned,
}
