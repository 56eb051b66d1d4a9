use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, ScrapeError};

use super::family::{Child, Family};
use super::{Bucket, Desc, HistogramValue, MetricKind, Opts, PointValue};

/// Conventional latency buckets in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// `count` buckets starting at `start`, each `width` apart.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 || width <= 0.0 {
        return Err(ScrapeError::InvalidArgument(
            "linear buckets need count > 0 and width > 0".into(),
        ));
    }
    Ok((0..count).map(|i| start + width * i as f64).collect())
}

/// `count` buckets starting at `start`, each `factor` times the previous.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 || start <= 0.0 || factor <= 1.0 {
        return Err(ScrapeError::InvalidArgument(
            "exponential buckets need count > 0, start > 0 and factor > 1".into(),
        ));
    }
    let mut out = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        out.push(next);
        next *= factor;
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOpts {
    pub common: Opts,
    /// Upper bounds; `+Inf` is implicit and may be omitted.
    pub buckets: Vec<f64>,
}

impl HistogramOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            common: Opts::new(name, help),
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }

    pub fn labels(mut self, names: &[&str]) -> Self {
        self.common = self.common.labels(names);
        self
    }

    pub fn buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }
}

/// Finite, strictly increasing bounds with a trailing `+Inf` dropped.
fn validate_buckets(name: &str, mut buckets: Vec<f64>) -> Result<Arc<[f64]>> {
    if buckets.last() == Some(&f64::INFINITY) {
        buckets.pop();
    }
    if buckets.is_empty() {
        return Err(ScrapeError::InvalidArgument(format!(
            "histogram {name} needs at least one finite bucket"
        )));
    }
    if buckets.iter().any(|b| !b.is_finite()) {
        return Err(ScrapeError::InvalidArgument(format!(
            "histogram {name} buckets must be finite"
        )));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ScrapeError::InvalidArgument(format!(
            "histogram {name} buckets must be strictly increasing"
        )));
    }
    Ok(buckets.into())
}

#[derive(Debug)]
struct HistogramState {
    /// Cumulative: slot `i` counts observations `<= bounds[i]`.
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

#[derive(Debug)]
pub(crate) struct HistogramCell {
    bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

impl HistogramCell {
    fn observe(&self, v: f64) {
        let mut st = self.state.lock();
        st.count += 1;
        st.sum += v;
        for (slot, &bound) in st.buckets.iter_mut().zip(self.bounds.iter()) {
            if v <= bound {
                *slot += 1;
            }
        }
    }
}

impl Child for HistogramCell {
    type Config = Arc<[f64]>;

    fn new(bounds: &Arc<[f64]>) -> Self {
        Self {
            bounds: Arc::clone(bounds),
            state: Mutex::new(HistogramState {
                buckets: vec![0; bounds.len()],
                sum: 0.0,
                count: 0,
            }),
        }
    }

    fn point_value(&self) -> PointValue {
        let st = self.state.lock();
        PointValue::Histogram(HistogramValue {
            buckets: self
                .bounds
                .iter()
                .zip(st.buckets.iter())
                .map(|(&upper_bound, &cumulative_count)| Bucket {
                    upper_bound,
                    cumulative_count,
                })
                .collect(),
            sum: st.sum,
            count: st.count,
        })
    }
}

/// Distribution of observations over fixed buckets.
#[derive(Clone)]
pub struct Histogram {
    pub(crate) family: Arc<Family<HistogramCell>>,
}

impl Histogram {
    /// Unlabelled histogram with [`DEFAULT_BUCKETS`].
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Result<Self> {
        Self::with_opts(HistogramOpts::new(name, help))
    }

    pub fn with_opts(opts: HistogramOpts) -> Result<Self> {
        let bounds = validate_buckets(&opts.common.name, opts.buckets)?;
        let desc = Desc::new(opts.common, MetricKind::Histogram)?;
        Ok(Self {
            family: Arc::new(Family::new(desc, bounds)),
        })
    }

    pub fn desc(&self) -> &Desc {
        self.family.desc()
    }

    /// Configured finite upper bounds.
    pub fn bounds(&self) -> &[f64] {
        self.family.config()
    }

    pub fn observe(&self, v: f64) {
        self.family.unlabelled().observe(v);
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<HistogramChild> {
        Ok(HistogramChild(self.family.with_label_values(values)?))
    }

    pub fn remove_label_values(&self, values: &[&str]) -> bool {
        self.family.remove_label_values(values)
    }
}

/// Handle to one labelled histogram child.
#[derive(Clone)]
pub struct HistogramChild(Arc<HistogramCell>);

impl HistogramChild {
    pub fn observe(&self, v: f64) {
        self.0.observe(v);
    }
}
