//! On-demand collectors: metric sources computed at scrape time.

use crate::error::Result;
use crate::metric::MetricFamily;

/// A source that produces fresh families each time it is asked.
///
/// `collect` takes `&self` and may be called from overlapping scrapes, so
/// implementations must either tolerate concurrent calls or serialize
/// internally. Implementations must not hold on to request state.
///
/// Failures (an `Err` or a panic) are isolated by the registry: the
/// collector's families are left out of that snapshot and the failure is
/// logged and reported in [`crate::registry::Snapshot::failures`].
pub trait OnDemandCollector: Send + Sync {
    /// Short identifier used in logs and failure reports.
    fn name(&self) -> &str;

    fn collect(&self) -> Result<Vec<MetricFamily>>;
}

/// Adapts a closure into an [`OnDemandCollector`].
pub struct FnCollector<F> {
    name: String,
    f: F,
}

impl<F> FnCollector<F>
where
    F: Fn() -> Result<Vec<MetricFamily>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> OnDemandCollector for FnCollector<F>
where
    F: Fn() -> Result<Vec<MetricFamily>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn collect(&self) -> Result<Vec<MetricFamily>> {
        (self.f)()
    }
}
