use anyhow::Result;
use sheetfeed::{config::Config, fetch::DataFetcher, server};
use std::{env, path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = env::args()
        .nth(1)
        .or_else(|| env::var("SHEETFEED_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!(
        sheet = %config.sheet_name,
        cache_seconds = config.cache_seconds,
        time_zone = %config.time_zone,
        "config loaded"
    );

    // ─── 3) build fetcher & serve ────────────────────────────────────
    let fetcher = Arc::new(DataFetcher::from_config(&config)?);
    server::serve(fetcher, config.port).await?;

    info!("all done");
    Ok(())
}
