//! Axum router wiring.
//!
//! Exposes the configured scrape path; every other path hits the fallback.

use axum::{routing::get, Router};

use crate::{app_state::ScrapeState, ops};

pub fn build_router(state: ScrapeState) -> Router {
    let path = state.path().to_string();
    Router::new()
        .route(&path, get(ops::metrics))
        .fallback(ops::fallback)
        .with_state(state)
}
