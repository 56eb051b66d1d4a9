//! HTTP handlers.
//!
//! - `<path>` : scrape (text or delimited protobuf, negotiated from `Accept`)
//! - anything else : plain-text pointer to the metrics path

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use scrapeport_core::exposition::{process_scrape_request, ContentType};

use crate::app_state::ScrapeState;

#[tracing::instrument(skip_all, name = "scrapeport.scrape")]
pub async fn metrics(State(state): State<ScrapeState>, headers: HeaderMap) -> Response {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let content_type = ContentType::negotiate(accept);
    let started = Instant::now();

    // Collectors may query the OS; keep them off the async workers.
    let registry = state.registry();
    let rendered = tokio::task::spawn_blocking(move || {
        let snapshot = registry.collect_all();
        let mut body = Vec::new();
        process_scrape_request(&snapshot, content_type, &mut body).map(|()| (snapshot, body))
    })
    .await;

    match rendered {
        Ok(Ok((snapshot, body))) => {
            let elapsed = started.elapsed();
            if let Some(m) = state.scrape_metrics() {
                m.record(content_type, elapsed, &snapshot.failures);
            }
            tracing::debug!(
                families = snapshot.len(),
                failed_collectors = snapshot.failures.len(),
                bytes = body.len(),
                format = content_type.format_name(),
                elapsed_us = elapsed.as_micros() as u64,
                "scrape served"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type.as_str())],
                body,
            )
                .into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, format = content_type.format_name(), "scrape render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render metrics").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "scrape task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to collect metrics").into_response()
        }
    }
}

pub async fn fallback(State(state): State<ScrapeState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("metrics are served at {}\n", state.path()),
    )
}
