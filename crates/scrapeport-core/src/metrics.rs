//! Shorthand constructors bound to [`default_registry`].
//!
//! Each call is get-or-create: repeating it with the same definition returns
//! the instrument registered the first time.

use crate::error::Result;
use crate::metric::{Counter, Gauge, Histogram, HistogramOpts, Opts, Summary, SummaryOpts};
use crate::registry::default_registry;

pub fn create_counter(name: &str, help: &str, labels: &[&str]) -> Result<Counter> {
    default_registry().counter(Opts::new(name, help).labels(labels))
}

pub fn create_gauge(name: &str, help: &str, labels: &[&str]) -> Result<Gauge> {
    default_registry().gauge(Opts::new(name, help).labels(labels))
}

pub fn create_histogram(name: &str, help: &str, buckets: Option<Vec<f64>>) -> Result<Histogram> {
    let mut opts = HistogramOpts::new(name, help);
    if let Some(b) = buckets {
        opts = opts.buckets(b);
    }
    default_registry().histogram(opts)
}

pub fn create_summary(name: &str, help: &str) -> Result<Summary> {
    default_registry().summary(SummaryOpts::new(name, help))
}
