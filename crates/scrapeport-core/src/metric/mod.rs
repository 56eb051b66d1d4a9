//! Metric model: descriptors, instruments, and the collected value types.
//!
//! Instruments (`Counter`, `Gauge`, `Histogram`, `Summary`) are cheap handles to
//! a shared family of children keyed by label values. Collection turns a
//! family into a [`MetricFamily`], which flattens into [`Sample`]s following
//! the `_bucket` / `_sum` / `_count` naming convention.

mod counter;
mod family;
mod gauge;
mod histogram;
mod instrument;
mod summary;

pub use counter::{Counter, CounterChild};
pub use gauge::{Gauge, GaugeChild};
pub use histogram::{
    exponential_buckets, linear_buckets, Histogram, HistogramChild, HistogramOpts,
    DEFAULT_BUCKETS,
};
pub use instrument::{Instrument, IntoInstrument};
pub use summary::{Summary, SummaryChild, SummaryOpts, DEFAULT_OBJECTIVES};

use crate::error::{Result, ScrapeError};

/// Kind of a metric family, as announced by `# TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricKind {
    /// Name used in the text exposition format.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::Untyped => "untyped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "histogram" => Some(MetricKind::Histogram),
            "summary" => Some(MetricKind::Summary),
            "untyped" => Some(MetricKind::Untyped),
            _ => None,
        }
    }

    /// Every sample name a family of this kind emits.
    pub fn series_names(self, name: &str) -> Vec<String> {
        let suffixes: &[&str] = match self {
            MetricKind::Histogram => &["", "_bucket", "_sum", "_count"],
            MetricKind::Summary => &["", "_sum", "_count"],
            _ => &[""],
        };
        suffixes.iter().map(|s| format!("{name}{s}")).collect()
    }
}

/// Name, help and label schema shared by every instrument kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl Opts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
        }
    }

    /// Set the ordered label schema.
    pub fn labels(mut self, names: &[&str]) -> Self {
        self.label_names = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

/// Validated identity of an instrument: name + ordered label names, plus help and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

impl Desc {
    pub fn new(opts: Opts, kind: MetricKind) -> Result<Self> {
        if !is_valid_metric_name(&opts.name) {
            return Err(ScrapeError::InvalidArgument(format!(
                "invalid metric name: {:?}",
                opts.name
            )));
        }

        for (i, label) in opts.label_names.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(ScrapeError::InvalidArgument(format!(
                    "invalid label name {label:?} on {}",
                    opts.name
                )));
            }
            if opts.label_names[..i].contains(label) {
                return Err(ScrapeError::InvalidArgument(format!(
                    "duplicate label name {label:?} on {}",
                    opts.name
                )));
            }
            let reserved = match kind {
                MetricKind::Histogram => label == "le",
                MetricKind::Summary => label == "quantile",
                _ => false,
            };
            if reserved {
                return Err(ScrapeError::InvalidArgument(format!(
                    "label {label:?} is reserved for {} metrics",
                    kind.as_str()
                )));
            }
        }

        Ok(Self {
            name: opts.name,
            help: opts.help,
            kind,
            label_names: opts.label_names,
        })
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Cumulative histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    /// Finite buckets only; the `+Inf` bucket equals `count`.
    pub buckets: Vec<Bucket>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryValue {
    /// `(quantile, value)` pairs in objective order.
    pub quantiles: Vec<(f64, f64)>,
    pub sum: f64,
    pub count: u64,
}

/// Value of one child at collection time.
#[derive(Debug, Clone, PartialEq)]
pub enum PointValue {
    Counter(f64),
    Gauge(f64),
    Untyped(f64),
    Histogram(HistogramValue),
    Summary(SummaryValue),
}

/// One labelled child of a family, as read during collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Values for the family's label names; empty for the unlabelled child.
    pub label_values: Vec<String>,
    pub value: PointValue,
    pub timestamp_ms: Option<i64>,
}

/// Immutable exposition unit: one line of the text format.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

/// Everything collected for one metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
    pub points: Vec<MetricPoint>,
}

impl MetricFamily {
    /// Empty family; on-demand collectors fill it with [`MetricFamily::with_point`].
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn with_label_names(mut self, names: &[&str]) -> Self {
        self.label_names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_point(mut self, label_values: &[&str], value: PointValue) -> Self {
        self.points.push(MetricPoint {
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
            timestamp_ms: None,
        });
        self
    }

    /// Single unlabelled gauge value.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, MetricKind::Gauge).with_point(&[], PointValue::Gauge(value))
    }

    /// Single unlabelled counter value.
    pub fn counter(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self::new(name, help, MetricKind::Counter).with_point(&[], PointValue::Counter(value))
    }

    /// Flatten points into exposition samples.
    pub fn samples(&self) -> Vec<Sample> {
        let mut out = Vec::new();
        for point in &self.points {
            let labels: Vec<(String, String)> = self
                .label_names
                .iter()
                .zip(point.label_values.iter())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let ts = point.timestamp_ms;

            let sample = |suffix: &str, extra: Option<(&str, String)>, value: f64| {
                let mut labels = labels.clone();
                if let Some((k, v)) = extra {
                    labels.push((k.to_string(), v));
                }
                Sample {
                    name: format!("{}{}", self.name, suffix),
                    labels,
                    value,
                    timestamp_ms: ts,
                }
            };

            match &point.value {
                PointValue::Counter(v) | PointValue::Gauge(v) | PointValue::Untyped(v) => {
                    out.push(sample("", None, *v));
                }
                PointValue::Histogram(h) => {
                    for b in &h.buckets {
                        out.push(sample(
                            "_bucket",
                            Some(("le", format_float(b.upper_bound))),
                            b.cumulative_count as f64,
                        ));
                    }
                    out.push(sample("_bucket", Some(("le", "+Inf".into())), h.count as f64));
                    out.push(sample("_sum", None, h.sum));
                    out.push(sample("_count", None, h.count as f64));
                }
                PointValue::Summary(s) => {
                    for (q, v) in &s.quantiles {
                        out.push(sample("", Some(("quantile", format_float(*q))), *v));
                    }
                    out.push(sample("_sum", None, s.sum));
                    out.push(sample("_count", None, s.count as f64));
                }
            }
        }
        out
    }
}

/// Float rendering shared by values and `le`/`quantile` labels.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        v.to_string()
    }
}

/// Inverse of [`format_float`]; also accepts `Inf` / `inf` spellings.
pub fn parse_float(s: &str) -> Option<f64> {
    match s {
        "+Inf" | "Inf" | "+inf" | "inf" => Some(f64::INFINITY),
        "-Inf" | "-inf" => Some(f64::NEG_INFINITY),
        "NaN" | "nan" => Some(f64::NAN),
        _ => s.parse().ok(),
    }
}

/// Atomic f64 stored as raw bits; `add` is a CAS loop.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64(std::sync::atomic::AtomicU64);

impl AtomicF64 {
    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(std::sync::atomic::Ordering::Acquire))
    }

    pub(crate) fn set(&self, v: f64) {
        self.0.store(v.to_bits(), std::sync::atomic::Ordering::Release);
    }

    pub(crate) fn add(&self, delta: f64) {
        use std::sync::atomic::Ordering;
        let mut cur = self.0.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(cur) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }
}
