//! Shared state handed to the scrape handler.

use std::sync::Arc;

use scrapeport_core::CollectorRegistry;

use crate::obs::ScrapeMetrics;

#[derive(Clone)]
pub struct ScrapeState {
    inner: Arc<ScrapeStateInner>,
}

struct ScrapeStateInner {
    registry: Arc<CollectorRegistry>,
    path: String,
    scrape_metrics: Option<ScrapeMetrics>,
}

impl ScrapeState {
    pub fn new(
        registry: Arc<CollectorRegistry>,
        path: impl Into<String>,
        scrape_metrics: Option<ScrapeMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(ScrapeStateInner {
                registry,
                path: path.into(),
                scrape_metrics,
            }),
        }
    }

    pub fn registry(&self) -> Arc<CollectorRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn scrape_metrics(&self) -> Option<&ScrapeMetrics> {
        self.inner.scrape_metrics.as_ref()
    }
}
