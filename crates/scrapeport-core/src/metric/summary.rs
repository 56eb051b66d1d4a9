//! Summary with an exact sliding-window quantile estimator.
//!
//! The window (`max_age`) is split into `age_buckets` sub-windows. Observations
//! land in the newest sub-window; sub-windows older than `max_age` are cleared
//! lazily on the next observe or collect. A φ-quantile is the nearest-rank
//! value over every observation still in the window:
//! `sorted[ceil(φ·n) - 1]`, with `φ = 0` giving the minimum and an empty
//! window giving `NaN`. For a given input sequence inside one window the
//! result is deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Result, ScrapeError};

use super::family::{Child, Family};
use super::{Desc, MetricKind, Opts, PointValue, SummaryValue};

pub const DEFAULT_OBJECTIVES: [f64; 3] = [0.5, 0.9, 0.99];
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(600);
const DEFAULT_AGE_BUCKETS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOpts {
    pub common: Opts,
    /// Quantiles in `[0, 1]` to publish.
    pub objectives: Vec<f64>,
    pub max_age: Duration,
    pub age_buckets: u32,
}

impl SummaryOpts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            common: Opts::new(name, help),
            objectives: DEFAULT_OBJECTIVES.to_vec(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
        }
    }

    pub fn labels(mut self, names: &[&str]) -> Self {
        self.common = self.common.labels(names);
        self
    }

    pub fn objectives(mut self, objectives: Vec<f64>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn max_age(mut self, max_age: Duration, age_buckets: u32) -> Self {
        self.max_age = max_age;
        self.age_buckets = age_buckets;
        self
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct SummaryConfig {
    objectives: Vec<f64>,
    max_age: Duration,
    age_buckets: u32,
}

impl SummaryConfig {
    fn validate(name: &str, opts: &SummaryOpts) -> Result<Self> {
        if opts
            .objectives
            .iter()
            .any(|q| !(0.0..=1.0).contains(q))
        {
            return Err(ScrapeError::InvalidArgument(format!(
                "summary {name} objectives must be within [0, 1]"
            )));
        }
        if opts.age_buckets == 0 || opts.max_age.is_zero() {
            return Err(ScrapeError::InvalidArgument(format!(
                "summary {name} needs max_age > 0 and age_buckets > 0"
            )));
        }
        if (opts.max_age / opts.age_buckets).is_zero() {
            return Err(ScrapeError::InvalidArgument(format!(
                "summary {name} max_age is too short to split into {} age buckets",
                opts.age_buckets
            )));
        }
        let mut objectives = opts.objectives.clone();
        objectives.sort_by(f64::total_cmp);
        objectives.dedup();
        Ok(Self {
            objectives,
            max_age: opts.max_age,
            age_buckets: opts.age_buckets,
        })
    }
}

/// Ring of sub-windows; `head` is the one currently receiving observations.
#[derive(Debug)]
struct SlidingWindow {
    slots: Vec<Vec<f64>>,
    head: usize,
    head_started: Instant,
    slot_width: Duration,
}

impl SlidingWindow {
    fn new(cfg: &SummaryConfig, now: Instant) -> Self {
        let n = cfg.age_buckets as usize;
        Self {
            slots: vec![Vec::new(); n],
            head: 0,
            head_started: now,
            slot_width: cfg.max_age / cfg.age_buckets,
        }
    }

    fn rotate(&mut self, now: Instant) {
        let n = self.slots.len();
        let mut rotated = 0;
        while now.saturating_duration_since(self.head_started) >= self.slot_width {
            if rotated >= n {
                // Idle for longer than the whole window.
                self.slots.iter_mut().for_each(Vec::clear);
                self.head_started = now;
                return;
            }
            self.head = (self.head + 1) % n;
            if let Some(slot) = self.slots.get_mut(self.head) {
                slot.clear();
            }
            self.head_started += self.slot_width;
            rotated += 1;
        }
    }

    fn push(&mut self, v: f64, now: Instant) {
        self.rotate(now);
        if let Some(slot) = self.slots.get_mut(self.head) {
            slot.push(v);
        }
    }

    fn quantiles(&mut self, objectives: &[f64], now: Instant) -> Vec<(f64, f64)> {
        self.rotate(now);
        let mut all: Vec<f64> = self.slots.iter().flatten().copied().collect();
        all.sort_by(f64::total_cmp);
        objectives
            .iter()
            .map(|&q| (q, nearest_rank(&all, q)))
            .collect()
    }
}

fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    let rank = (q * n as f64).ceil() as usize;
    let idx = rank.clamp(1, n) - 1;
    sorted.get(idx).copied().unwrap_or(f64::NAN)
}

#[derive(Debug)]
struct SummaryState {
    window: SlidingWindow,
    sum: f64,
    count: u64,
}

#[derive(Debug)]
pub(crate) struct SummaryCell {
    config: Arc<SummaryConfig>,
    state: Mutex<SummaryState>,
}

impl SummaryCell {
    fn observe(&self, v: f64) {
        let now = Instant::now();
        let mut st = self.state.lock();
        st.sum += v;
        st.count += 1;
        st.window.push(v, now);
    }
}

impl Child for SummaryCell {
    type Config = Arc<SummaryConfig>;

    fn new(config: &Arc<SummaryConfig>) -> Self {
        Self {
            config: Arc::clone(config),
            state: Mutex::new(SummaryState {
                window: SlidingWindow::new(config, Instant::now()),
                sum: 0.0,
                count: 0,
            }),
        }
    }

    fn point_value(&self) -> PointValue {
        let now = Instant::now();
        let mut st = self.state.lock();
        let quantiles = st.window.quantiles(&self.config.objectives, now);
        PointValue::Summary(SummaryValue {
            quantiles,
            sum: st.sum,
            count: st.count,
        })
    }
}

/// Running sum/count plus windowed quantiles.
#[derive(Clone)]
pub struct Summary {
    pub(crate) family: Arc<Family<SummaryCell>>,
}

impl Summary {
    /// Unlabelled summary with [`DEFAULT_OBJECTIVES`] over a 10 minute window.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Result<Self> {
        Self::with_opts(SummaryOpts::new(name, help))
    }

    pub fn with_opts(opts: SummaryOpts) -> Result<Self> {
        let config = SummaryConfig::validate(&opts.common.name, &opts)?;
        let desc = Desc::new(opts.common, MetricKind::Summary)?;
        Ok(Self {
            family: Arc::new(Family::new(desc, Arc::new(config))),
        })
    }

    pub fn desc(&self) -> &Desc {
        self.family.desc()
    }

    pub fn objectives(&self) -> &[f64] {
        &self.family.config().objectives
    }

    pub fn observe(&self, v: f64) {
        self.family.unlabelled().observe(v);
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<SummaryChild> {
        Ok(SummaryChild(self.family.with_label_values(values)?))
    }

    pub fn remove_label_values(&self, values: &[&str]) -> bool {
        self.family.remove_label_values(values)
    }
}

/// Handle to one labelled summary child.
#[derive(Clone)]
pub struct SummaryChild(Arc<SummaryCell>);

impl SummaryChild {
    pub fn observe(&self, v: f64) {
        self.0.observe(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(age_buckets: u32) -> SummaryConfig {
        SummaryConfig {
            objectives: vec![0.5],
            max_age: Duration::from_secs(10),
            age_buckets,
        }
    }

    #[test]
    fn nearest_rank_edges() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(nearest_rank(&sorted, 0.0), 1.0);
        assert_eq!(nearest_rank(&sorted, 0.5), 2.0);
        assert_eq!(nearest_rank(&sorted, 0.75), 3.0);
        assert_eq!(nearest_rank(&sorted, 1.0), 4.0);
        assert!(nearest_rank(&[], 0.5).is_nan());
    }

    #[test]
    fn window_drops_expired_slots() {
        let start = Instant::now();
        let mut w = SlidingWindow::new(&cfg(5), start);
        w.push(100.0, start);
        w.push(1.0, start + Duration::from_secs(4));

        let q = w.quantiles(&[1.0], start + Duration::from_secs(4));
        assert_eq!(q, vec![(1.0, 100.0)]);

        // The first slot (0s..2s) falls out once the window has advanced by max_age.
        let q = w.quantiles(&[1.0], start + Duration::from_secs(11));
        assert_eq!(q, vec![(1.0, 1.0)]);
    }

    #[test]
    fn long_idle_clears_everything() {
        let start = Instant::now();
        let mut w = SlidingWindow::new(&cfg(2), start);
        w.push(7.0, start);
        let q = w.quantiles(&[0.5], start + Duration::from_secs(3600));
        assert!(q[0].1.is_nan());
    }
}
