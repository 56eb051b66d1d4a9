//! scrapeport HTTP exporter.
//!
//! Wires a `CollectorRegistry` behind an axum scrape endpoint with
//! content negotiation, optional TLS, and a start/stop lifecycle. Used by
//! the `scrapeport` binary and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod server;

pub use obs::{ProcessCollector, ScrapeMetrics};
pub use server::{MetricServer, MetricServerBuilder, ServerPhase, TlsCertificate};
