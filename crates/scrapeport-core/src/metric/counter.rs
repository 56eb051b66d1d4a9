use std::sync::Arc;

use crate::error::{Result, ScrapeError};

use super::family::{Child, Family};
use super::{AtomicF64, Desc, MetricKind, Opts, PointValue};

#[derive(Debug, Default)]
pub(crate) struct CounterCell {
    value: AtomicF64,
}

impl CounterCell {
    fn inc_by(&self, v: f64) -> Result<()> {
        if v < 0.0 || v.is_nan() {
            return Err(ScrapeError::InvalidArgument(format!(
                "counter increment must be non-negative, got {v}"
            )));
        }
        self.value.add(v);
        Ok(())
    }
}

impl Child for CounterCell {
    type Config = ();

    fn new(_: &()) -> Self {
        Self::default()
    }

    fn point_value(&self) -> PointValue {
        PointValue::Counter(self.value.get())
    }
}

/// Monotonically non-decreasing value.
#[derive(Clone)]
pub struct Counter {
    pub(crate) family: Arc<Family<CounterCell>>,
}

impl Counter {
    /// Unlabelled counter.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Result<Self> {
        Self::with_opts(Opts::new(name, help))
    }

    pub fn with_opts(opts: Opts) -> Result<Self> {
        let desc = Desc::new(opts, MetricKind::Counter)?;
        Ok(Self {
            family: Arc::new(Family::new(desc, ())),
        })
    }

    pub fn desc(&self) -> &Desc {
        self.family.desc()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.family.unlabelled().value.add(1.0);
    }

    /// Increment by `v`; negative or NaN amounts are rejected and leave the value unchanged.
    pub fn inc_by(&self, v: f64) -> Result<()> {
        self.family.unlabelled().inc_by(v)
    }

    pub fn get(&self) -> f64 {
        self.family.unlabelled().value.get()
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<CounterChild> {
        Ok(CounterChild(self.family.with_label_values(values)?))
    }

    pub fn remove_label_values(&self, values: &[&str]) -> bool {
        self.family.remove_label_values(values)
    }
}

/// Handle to one labelled counter child.
#[derive(Clone)]
pub struct CounterChild(Arc<CounterCell>);

impl CounterChild {
    pub fn inc(&self) {
        self.0.value.add(1.0);
    }

    pub fn inc_by(&self, v: f64) -> Result<()> {
        self.0.inc_by(v)
    }

    pub fn get(&self) -> f64 {
        self.0.value.get()
    }
}
