//! Fetch the configured tab once, bypassing the cache, and print the payload.
//!
//! Usage: `dump_payload [config.yaml]`. Handy for checking how a changed sheet
//! layout resolves its status column before the server picks it up.

use anyhow::{Context, Result};
use sheetfeed::{config::Config, fetch::DataFetcher};
use std::{env, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("SHEETFEED_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let fetcher = DataFetcher::from_config(&config)?;

    let payload = fetcher.compute().await?;
    info!(
        rows = payload.meta.row_count,
        status_column = ?payload.debug.installment_status_index,
        "computed payload"
    );
    let text = serde_json::to_string_pretty(&payload).context("serialising payload")?;
    println!("{}", text);
    Ok(())
}
