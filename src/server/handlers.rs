// src/server/handlers.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{error, info, warn};
use warp::{
    http::header::{HeaderValue, CONTENT_TYPE},
    hyper::{body::Bytes, Body},
    reject::Rejection,
    reply::{Reply, Response},
};

use crate::fetch::{Ack, DataFetcher, ErrorPayload};

/// The only action the invalidate endpoint understands.
pub const PURGE_ACTION: &str = "purgeCache";

const JSON_TYPE: &str = "application/json";
const JSONP_TYPE: &str = "application/javascript; charset=utf-8";

static CALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]*$").expect("callback pattern should be valid")
});

pub async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "sheetfeed"
    })))
}

/// `GET /`: the full payload as JSON, or JSONP when `callback` is given. Never rejects.
pub async fn read(params: HashMap<String, String>, fetcher: Arc<DataFetcher>) -> Response {
    let callback = params
        .get("callback")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(cb) = &callback {
        if !CALLBACK_RE.is_match(cb) {
            warn!(callback = %cb, "rejecting invalid JSONP callback");
            return render(&ErrorPayload::new(format!("Invalid callback name: {}", cb)), None);
        }
    }

    let start = Instant::now();
    // run on its own task so a panic while building the payload still yields an error body
    let outcome = tokio::spawn(async move { fetcher.fetch().await }).await;

    match outcome {
        Ok(Ok(payload)) => {
            info!(
                rows = payload.meta.row_count,
                jsonp = callback.is_some(),
                elapsed = ?start.elapsed(),
                "served read"
            );
            render(&payload, callback.as_deref())
        }
        Ok(Err(e)) => {
            let message = format!("{:#}", e);
            error!(error = %message, elapsed = ?start.elapsed(), "read failed");
            render(&ErrorPayload::new(message), callback.as_deref())
        }
        Err(e) => {
            error!(error = %e, "read task failed");
            render(
                &ErrorPayload::new(format!("Internal error: {}", e)),
                callback.as_deref(),
            )
        }
    }
}

/// `POST /`: `action=purgeCache` from the query string or a form body. Never rejects.
pub async fn invalidate(
    query: HashMap<String, String>,
    body: Bytes,
    fetcher: Arc<DataFetcher>,
) -> Response {
    let mut params = query;
    params.extend(url::form_urlencoded::parse(&body[..]).into_owned());

    match params.get("action").map(String::as_str) {
        Some(PURGE_ACTION) => match fetcher.purge() {
            Ok(()) => render(&Ack::new("Cache purged"), None),
            Err(e) => {
                error!(error = %e, "cache purge failed");
                render(&ErrorPayload::new(e.to_string()), None)
            }
        },
        other => {
            warn!(action = ?other, "unsupported action");
            render(&ErrorPayload::new("Unsupported action"), None)
        }
    }
}

/// Serialise `body` as JSON, wrapped as `callback(<json>)` when a callback is given.
fn render<T: Serialize>(body: &T, callback: Option<&str>) -> Response {
    let json = serde_json::to_string(body).unwrap_or_else(|e| {
        serde_json::json!({ "success": false, "error": e.to_string() }).to_string()
    });
    let (content_type, text) = match callback {
        Some(cb) => (JSONP_TYPE, format!("{}({})", cb, json)),
        None => (JSON_TYPE, json),
    };

    let mut response = Response::new(Body::from(text));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
