use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

use super::family::{Child, Family};
use super::{AtomicF64, Desc, MetricKind, Opts, PointValue};

#[derive(Debug, Default)]
pub(crate) struct GaugeCell {
    value: AtomicF64,
}

impl Child for GaugeCell {
    type Config = ();

    fn new(_: &()) -> Self {
        Self::default()
    }

    fn point_value(&self) -> PointValue {
        PointValue::Gauge(self.value.get())
    }
}

fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Value that can go up and down.
#[derive(Clone)]
pub struct Gauge {
    pub(crate) family: Arc<Family<GaugeCell>>,
}

impl Gauge {
    /// Unlabelled gauge.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Result<Self> {
        Self::with_opts(Opts::new(name, help))
    }

    pub fn with_opts(opts: Opts) -> Result<Self> {
        let desc = Desc::new(opts, MetricKind::Gauge)?;
        Ok(Self {
            family: Arc::new(Family::new(desc, ())),
        })
    }

    pub fn desc(&self) -> &Desc {
        self.family.desc()
    }

    pub fn inc(&self) {
        self.add(1.0);
    }

    pub fn dec(&self) {
        self.add(-1.0);
    }

    pub fn add(&self, v: f64) {
        self.family.unlabelled().value.add(v);
    }

    pub fn sub(&self, v: f64) {
        self.add(-v);
    }

    pub fn set(&self, v: f64) {
        self.family.unlabelled().value.set(v);
    }

    /// Set to the current unix time in seconds.
    pub fn set_to_current_time(&self) {
        self.set(unix_now_secs());
    }

    pub fn get(&self) -> f64 {
        self.family.unlabelled().value.get()
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<GaugeChild> {
        Ok(GaugeChild(self.family.with_label_values(values)?))
    }

    pub fn remove_label_values(&self, values: &[&str]) -> bool {
        self.family.remove_label_values(values)
    }
}

/// Handle to one labelled gauge child.
#[derive(Clone)]
pub struct GaugeChild(Arc<GaugeCell>);

impl GaugeChild {
    pub fn inc(&self) {
        self.0.value.add(1.0);
    }

    pub fn dec(&self) {
        self.0.value.add(-1.0);
    }

    pub fn add(&self, v: f64) {
        self.0.value.add(v);
    }

    pub fn sub(&self, v: f64) {
        self.0.value.add(-v);
    }

    pub fn set(&self, v: f64) {
        self.0.value.set(v);
    }

    pub fn set_to_current_time(&self) {
        self.0.value.set(unix_now_secs());
    }

    pub fn get(&self) -> f64 {
        self.0.value.get()
    }
}
