// src/server/mod.rs
use anyhow::{Context, Result};
use std::{collections::HashMap, sync::Arc};
use tokio::signal;
use tracing::{error, info};
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::fetch::DataFetcher;

pub mod handlers;

/// `GET /health`, `GET /` (read) and `POST /` (invalidate), with permissive CORS.
pub fn routes(
    fetcher: Arc<DataFetcher>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_fetcher = warp::any().map(move || fetcher.clone());

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health_check);

    let read = warp::path::end()
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_fetcher.clone())
        .then(handlers::read);

    let invalidate = warp::path::end()
        .and(warp::post())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::bytes())
        .and(with_fetcher)
        .then(handlers::invalidate);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"]);

    health
        .or(read)
        .or(invalidate)
        .with(cors)
        .with(warp::trace::request())
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(fetcher: Arc<DataFetcher>, port: u16) -> Result<()> {
    let (addr, server) = warp::serve(routes(fetcher))
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], port), shutdown_signal())
        .with_context(|| format!("binding to port {}", port))?;

    info!("Server listening on http://{}", addr);
    info!("Read endpoint: GET http://{}/?callback=<fn>", addr);
    info!("Purge endpoint: POST http://{}/ action=purgeCache", addr);
    server.await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{Config, SourceKind};
    use crate::source::testing::{rows, StaticSource};
    use serde_json::Value;

    fn fetcher_for(name: &str) -> (Arc<DataFetcher>, Arc<StaticSource>) {
        let source = Arc::new(StaticSource::new(rows(&[
            &["RegNo", "Installment_status", "Scheme", "installment_status"],
            &["RG-1", "Fully Paid", "Regular", "Pending"],
            &["RG-2", "", "EMI", ""],
        ])));
        let config = Config {
            spreadsheet_name: Some(name.to_string()),
            source: SourceKind::Csv,
            ..Config::default()
        };
        let fetcher =
            DataFetcher::new(&config, source.clone(), Arc::new(MemoryCache::new())).unwrap();
        (Arc::new(fetcher), source)
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn health() {
        let (fetcher, _) = fetcher_for("Fees");
        let resp = warp::test::request()
            .path("/health")
            .reply(&routes(fetcher))
            .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp.body())["status"], "healthy");
    }

    #[tokio::test]
    async fn read_plain_json() {
        let (fetcher, _) = fetcher_for("Fees");
        let resp = warp::test::request().path("/").reply(&routes(fetcher)).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "application/json");

        let v = json_body(resp.body());
        assert_eq!(v["success"], true);
        assert_eq!(v["meta"]["rowCount"], 2);
        assert_eq!(v["data"][0]["Installment_status"], "Fully Paid");
        assert_eq!(v["data"][1]["RegNo"], "RG-2");
        assert_eq!(v["debug"]["installmentStatusIndex"], 1);
        assert_eq!(v["debug"]["chosenColumn"]["header"], "Installment_status");
    }

    #[tokio::test]
    async fn read_jsonp() {
        let (fetcher, _) = fetcher_for("Fees");
        let resp = warp::test::request()
            .path("/?callback=onRows")
            .reply(&routes(fetcher))
            .await;
        assert_eq!(
            resp.headers()["content-type"],
            "application/javascript; charset=utf-8"
        );
        let body = std::str::from_utf8(resp.body()).unwrap();
        assert!(body.starts_with("onRows(") && body.ends_with(')'));
        let inner = &body["onRows(".len()..body.len() - 1];
        assert_eq!(json_body(inner.as_bytes())["success"], true);
    }

    #[tokio::test]
    async fn invalid_callback_is_an_error_payload() {
        let (fetcher, source) = fetcher_for("Fees");
        let resp = warp::test::request()
            .path("/?callback=alert(1)")
            .reply(&routes(fetcher))
            .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "application/json");
        assert_eq!(json_body(resp.body())["success"], false);
        assert_eq!(source.reads(), 0);
    }

    #[tokio::test]
    async fn missing_spreadsheet_is_an_error_payload() {
        let (fetcher, _) = fetcher_for("Old Fee Book");
        let resp = warp::test::request()
            .path("/?callback=cb")
            .reply(&routes(fetcher))
            .await;
        assert_eq!(resp.status(), 200);
        let body = std::str::from_utf8(resp.body()).unwrap();
        let v = json_body(body["cb(".len()..body.len() - 1].as_bytes());
        assert_eq!(v["success"], false);
        assert!(v["error"].as_str().unwrap().contains("Old Fee Book"));
        assert!(v.get("data").is_none());
    }

    #[tokio::test]
    async fn purge_via_form_body() {
        let (fetcher, source) = fetcher_for("Fees");
        let api = routes(fetcher);

        warp::test::request().path("/").reply(&api).await;
        warp::test::request().path("/").reply(&api).await;
        assert_eq!(source.reads(), 1);

        let resp = warp::test::request()
            .method("POST")
            .path("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("action=purgeCache")
            .reply(&api)
            .await;
        let v = json_body(resp.body());
        assert_eq!(v["success"], true);
        assert_eq!(v["message"], "Cache purged");

        warp::test::request().path("/").reply(&api).await;
        assert_eq!(source.reads(), 2);
    }

    #[tokio::test]
    async fn purge_via_query() {
        let (fetcher, _) = fetcher_for("Fees");
        let resp = warp::test::request()
            .method("POST")
            .path("/?action=purgeCache")
            .reply(&routes(fetcher))
            .await;
        assert_eq!(json_body(resp.body())["message"], "Cache purged");
    }

    #[tokio::test]
    async fn unsupported_actions() {
        let (fetcher, _) = fetcher_for("Fees");
        let api = routes(fetcher);
        for path in ["/?action=dropTables", "/"] {
            let resp = warp::test::request()
                .method("POST")
                .path(path)
                .reply(&api)
                .await;
            assert_eq!(resp.status(), 200);
            assert_eq!(
                json_body(resp.body()),
                serde_json::json!({"success": false, "error": "Unsupported action"})
            );
        }
    }
}
