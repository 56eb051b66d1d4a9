//! scrapeport core: metric instruments, the collector registry, and the
//! exposition formats served to scrapers.
//!
//! This crate carries no HTTP or runtime dependencies; the server crate wires
//! it to a listener. Typical use:
//!
//! ```
//! use scrapeport_core::exposition::{text, ContentType};
//! use scrapeport_core::metric::Opts;
//! use scrapeport_core::registry::CollectorRegistry;
//!
//! let registry = CollectorRegistry::new();
//! let gauge = registry.gauge(Opts::new("queue_depth", "Jobs waiting")).unwrap();
//! gauge.set(3.0);
//!
//! let snapshot = registry.collect_all();
//! assert_eq!(ContentType::negotiate(None), ContentType::Text);
//! assert!(text::render(&snapshot).contains("queue_depth 3"));
//! ```
//!
//! # Guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Instrument
//! misuse surfaces as `ScrapeError::InvalidArgument`, registry conflicts as
//! `ScrapeError::DuplicateMetric`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod collector;
pub mod error;
pub mod exposition;
pub mod metric;
pub mod metrics;
pub mod registry;

/// Shared result type.
pub use error::{ErrorCode, Result, ScrapeError};
pub use collector::OnDemandCollector;
pub use registry::{default_registry, CollectorRegistry, Snapshot};
