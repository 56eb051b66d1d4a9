//! Collector registry: static instruments plus on-demand collectors.
//!
//! Locking:
//! - registration lists sit behind one `RwLock`, held only to mutate or copy them
//! - each instrument child synchronizes its own value
//!
//! `collect_all` copies both lists under the read lock and reads values after
//! releasing it, so a scrape never blocks instrument updates and never sees a
//! registration that started after it did.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::collector::OnDemandCollector;
use crate::error::{Result, ScrapeError};
use crate::metric::{
    Counter, Gauge, Histogram, HistogramOpts, Instrument, IntoInstrument, MetricFamily, Opts,
    Sample, Summary, SummaryOpts,
};

/// Collector that failed during one collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorFailure {
    pub collector: String,
    pub message: String,
}

/// Result of one `collect_all` pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub families: Vec<MetricFamily>,
    pub failures: Vec<CollectorFailure>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn family(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// All samples belonging to the family `name`.
    pub fn samples_for(&self, name: &str) -> Vec<Sample> {
        self.family(name).map(|f| f.samples()).unwrap_or_default()
    }
}

#[derive(Default)]
struct RegistryInner {
    instruments: Vec<Instrument>,
    collectors: Vec<Arc<dyn OnDemandCollector>>,
}

#[derive(Default)]
pub struct CollectorRegistry {
    inner: RwLock<RegistryInner>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument.
    ///
    /// Returns the already registered instrument when one with an identical
    /// definition exists under the same name; any other clash is a
    /// `DuplicateMetric` error. Histogram and summary families also own
    /// their `_bucket` / `_sum` / `_count` series names.
    pub fn register<I: IntoInstrument>(&self, instrument: I) -> Result<I> {
        let candidate = instrument.into_instrument();
        let mut inner = self.inner.write();

        if let Some(existing) = inner
            .instruments
            .iter()
            .find(|i| i.desc().name == candidate.desc().name)
        {
            if !existing.same_definition(&candidate) {
                return Err(ScrapeError::DuplicateMetric(format!(
                    "{} is already registered with a different definition",
                    candidate.desc().name
                )));
            }
            let existing = existing.clone();
            drop(inner);
            return I::from_instrument(existing).ok_or_else(|| {
                ScrapeError::DuplicateMetric(format!(
                    "{} is registered as a different kind",
                    candidate.desc().name
                ))
            });
        }

        let series = candidate.desc().kind.series_names(&candidate.desc().name);
        if let Some(clash) = inner.instruments.iter().find(|i| {
            i.desc()
                .kind
                .series_names(&i.desc().name)
                .iter()
                .any(|n| series.contains(n))
        }) {
            return Err(ScrapeError::DuplicateMetric(format!(
                "{} would emit series that collide with {}",
                candidate.desc().name,
                clash.desc().name
            )));
        }

        tracing::debug!(name = %candidate.desc().name, kind = candidate.desc().kind.as_str(), "metric registered");
        inner.instruments.push(candidate.clone());
        drop(inner);
        I::from_instrument(candidate).ok_or_else(|| {
            ScrapeError::InvalidArgument("instrument conversion failed".into())
        })
    }

    /// Get-or-create an unlabelled or labelled counter.
    pub fn counter(&self, opts: Opts) -> Result<Counter> {
        self.register(Counter::with_opts(opts)?)
    }

    pub fn gauge(&self, opts: Opts) -> Result<Gauge> {
        self.register(Gauge::with_opts(opts)?)
    }

    pub fn histogram(&self, opts: HistogramOpts) -> Result<Histogram> {
        self.register(Histogram::with_opts(opts)?)
    }

    pub fn summary(&self, opts: SummaryOpts) -> Result<Summary> {
        self.register(Summary::with_opts(opts)?)
    }

    /// Remove a static instrument by name. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        let before = inner.instruments.len();
        inner.instruments.retain(|i| i.desc().name != name);
        inner.instruments.len() != before
    }

    /// Add collectors; a collector object already registered is skipped.
    pub fn register_on_demand_collectors<I>(&self, collectors: I)
    where
        I: IntoIterator<Item = Arc<dyn OnDemandCollector>>,
    {
        let mut inner = self.inner.write();
        for c in collectors {
            if inner.collectors.iter().any(|existing| Arc::ptr_eq(existing, &c)) {
                continue;
            }
            tracing::debug!(collector = c.name(), "on-demand collector registered");
            inner.collectors.push(c);
        }
    }

    pub fn instrument_count(&self) -> usize {
        self.inner.read().instruments.len()
    }

    pub fn collector_count(&self) -> usize {
        self.inner.read().collectors.len()
    }

    /// Point-in-time snapshot of every instrument and on-demand collector.
    pub fn collect_all(&self) -> Snapshot {
        let (instruments, collectors) = {
            let inner = self.inner.read();
            (inner.instruments.clone(), inner.collectors.clone())
        };

        let mut snapshot = Snapshot::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(instruments.len());

        for inst in &instruments {
            let family = inst.collect();
            seen.extend(family.kind.series_names(&family.name));
            snapshot.families.push(family);
        }

        for collector in &collectors {
            let name = collector.name().to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| collector.collect()));
            let families = match outcome {
                Ok(Ok(families)) => families,
                Ok(Err(e)) => {
                    tracing::warn!(collector = %name, error = %e, "on-demand collector failed");
                    snapshot.failures.push(CollectorFailure {
                        collector: name,
                        message: e.to_string(),
                    });
                    continue;
                }
                Err(_) => {
                    tracing::warn!(collector = %name, "on-demand collector panicked");
                    snapshot.failures.push(CollectorFailure {
                        collector: name,
                        message: "collector panicked".into(),
                    });
                    continue;
                }
            };

            for mut family in families {
                let series = family.kind.series_names(&family.name);
                if series.iter().any(|n| seen.contains(n)) {
                    tracing::warn!(collector = %name, family = %family.name, "dropping family already present in this scrape");
                    continue;
                }

                let arity = family.label_names.len();
                let before = family.points.len();
                family.points.retain(|p| p.label_values.len() == arity);
                if family.points.len() != before {
                    tracing::warn!(
                        collector = %name,
                        family = %family.name,
                        dropped = before - family.points.len(),
                        "dropping points whose label values do not match the label names"
                    );
                }

                seen.extend(series);
                snapshot.families.push(family);
            }
        }

        snapshot
    }
}

static DEFAULT_REGISTRY: OnceLock<Arc<CollectorRegistry>> = OnceLock::new();

/// Process-wide registry, created on first access and never torn down.
pub fn default_registry() -> &'static Arc<CollectorRegistry> {
    DEFAULT_REGISTRY.get_or_init(|| Arc::new(CollectorRegistry::new()))
}

/// True when `registry` is the process-wide default.
pub fn is_default_registry(registry: &Arc<CollectorRegistry>) -> bool {
    DEFAULT_REGISTRY
        .get()
        .is_some_and(|d| Arc::ptr_eq(d, registry))
}
