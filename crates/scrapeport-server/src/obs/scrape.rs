//! Self-instrumentation of the scrape endpoint.
//!
//! Registered on the same registry the server exposes, so the next scrape
//! reports on the previous ones. Registration is get-or-create, which lets
//! several servers share one registry.

use std::time::Duration;

use scrapeport_core::error::Result;
use scrapeport_core::exposition::ContentType;
use scrapeport_core::metric::{Counter, Histogram, HistogramOpts, Opts};
use scrapeport_core::registry::CollectorFailure;
use scrapeport_core::CollectorRegistry;

// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s
const DURATION_BUCKETS: [f64; 9] = [0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

#[derive(Clone)]
pub struct ScrapeMetrics {
    requests: Counter,
    duration: Histogram,
    collector_failures: Counter,
}

impl ScrapeMetrics {
    pub fn register(registry: &CollectorRegistry) -> Result<Self> {
        let requests = registry.counter(
            Opts::new(
                "scrapeport_scrape_requests_total",
                "Scrapes served, by response format.",
            )
            .labels(&["format"]),
        )?;
        let duration = registry.histogram(
            HistogramOpts::new(
                "scrapeport_scrape_duration_seconds",
                "Time spent collecting and rendering one scrape.",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;
        let collector_failures = registry.counter(
            Opts::new(
                "scrapeport_collector_failures_total",
                "On-demand collector failures left out of a scrape.",
            )
            .labels(&["collector"]),
        )?;

        Ok(Self {
            requests,
            duration,
            collector_failures,
        })
    }

    /// Record one served scrape.
    pub fn record(&self, format: ContentType, elapsed: Duration, failures: &[CollectorFailure]) {
        if let Ok(c) = self.requests.with_label_values(&[format.format_name()]) {
            c.inc();
        }
        self.duration.observe(elapsed.as_secs_f64());
        for f in failures {
            if let Ok(c) = self.collector_failures.with_label_values(&[f.collector.as_str()]) {
                c.inc();
            }
        }
    }
}
