#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use scrapeport_core::metric::{
    exponential_buckets, linear_buckets, Bucket, Counter, Gauge, Histogram, HistogramOpts,
    Opts, PointValue, Summary, SummaryOpts,
};
use scrapeport_core::{CollectorRegistry, ScrapeError};

fn only_value(registry: &CollectorRegistry, name: &str) -> PointValue {
    let snapshot = registry.collect_all();
    let family = snapshot.family(name).expect("family present");
    assert_eq!(family.points.len(), 1);
    family.points[0].value.clone()
}

#[test]
fn counter_rejects_negative_increment_without_change() {
    let c = Counter::new("c_total", "").unwrap();
    c.inc_by(2.5).unwrap();

    let err = c.inc_by(-1.0).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_ARGUMENT");
    assert!(matches!(c.inc_by(f64::NAN), Err(ScrapeError::InvalidArgument(_))));
    assert_eq!(c.get(), 2.5);

    let child = Counter::with_opts(Opts::new("by_route_total", "").labels(&["route"]))
        .unwrap()
        .with_label_values(&["/"])
        .unwrap();
    assert!(child.inc_by(-0.5).is_err());
    assert_eq!(child.get(), 0.0);
}

#[test]
fn label_cardinality_mismatch_is_invalid_argument() {
    let g = Gauge::with_opts(Opts::new("g", "").labels(&["a", "b"])).unwrap();
    assert!(matches!(g.with_label_values(&["x"]), Err(ScrapeError::InvalidArgument(_))));
    assert!(g.with_label_values(&["x", "y"]).is_ok());
}

#[test]
fn invalid_names_are_rejected() {
    assert!(Gauge::new("1bad", "").is_err());
    assert!(Gauge::new("has-dash", "").is_err());
    assert!(Gauge::new("ok:name_1", "").is_ok());
    assert!(Gauge::with_opts(Opts::new("g", "").labels(&["__reserved"])).is_err());
    assert!(Gauge::with_opts(Opts::new("g", "").labels(&["dup", "dup"])).is_err());
    assert!(Histogram::with_opts(HistogramOpts::new("h", "").labels(&["le"])).is_err());
    assert!(Summary::with_opts(SummaryOpts::new("s", "").labels(&["quantile"])).is_err());
}

#[test]
fn concurrent_gauge_updates_lose_nothing() {
    let registry = CollectorRegistry::new();
    let g = registry.gauge(Opts::new("inflight", "")).unwrap();
    g.set(10.0);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let g = g.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    if t % 2 == 0 {
                        g.inc();
                    } else {
                        g.dec();
                    }
                    g.add(0.5);
                    g.sub(0.5);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(only_value(&registry, "inflight"), PointValue::Gauge(10.0));
}

#[test]
fn concurrent_counter_increments_are_exact() {
    let c = Arc::new(Counter::new("hits_total", "").unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    c.inc();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.get(), 80_000.0);
}

#[test]
fn gauge_set_to_current_time_is_recent() {
    let g = Gauge::new("last_run", "").unwrap();
    g.set_to_current_time();
    assert!(g.get() > 1_600_000_000.0);
}

#[test]
fn histogram_counts_cumulative_buckets() {
    let registry = CollectorRegistry::new();
    let h = registry
        .histogram(HistogramOpts::new("req_seconds", "").buckets(vec![0.1, 0.5, 1.0]))
        .unwrap();
    for v in [0.05, 0.1, 0.3, 0.7, 3.0] {
        h.observe(v);
    }

    let PointValue::Histogram(value) = only_value(&registry, "req_seconds") else {
        panic!("expected histogram");
    };
    assert_eq!(
        value.buckets,
        vec![
            Bucket { upper_bound: 0.1, cumulative_count: 2 },
            Bucket { upper_bound: 0.5, cumulative_count: 3 },
            Bucket { upper_bound: 1.0, cumulative_count: 4 },
        ]
    );
    assert_eq!(value.count, 5);
    assert!((value.sum - 4.15).abs() < 1e-9);

    let samples = registry.collect_all().samples_for("req_seconds");
    let names: Vec<_> = samples.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "req_seconds_bucket",
            "req_seconds_bucket",
            "req_seconds_bucket",
            "req_seconds_bucket",
            "req_seconds_sum",
            "req_seconds_count"
        ]
    );
    assert_eq!(samples[3].labels, vec![("le".to_string(), "+Inf".to_string())]);
    assert_eq!(samples[3].value, 5.0);
}

#[test]
fn histogram_bucket_validation() {
    assert!(Histogram::with_opts(HistogramOpts::new("h", "").buckets(vec![])).is_err());
    assert!(Histogram::with_opts(HistogramOpts::new("h", "").buckets(vec![1.0, 1.0])).is_err());
    assert!(Histogram::with_opts(HistogramOpts::new("h", "").buckets(vec![2.0, 1.0])).is_err());

    let h = Histogram::with_opts(HistogramOpts::new("h", "").buckets(vec![1.0, f64::INFINITY]))
        .unwrap();
    assert_eq!(h.bounds(), &[1.0]);

    assert_eq!(linear_buckets(1.0, 2.0, 3).unwrap(), vec![1.0, 3.0, 5.0]);
    assert_eq!(exponential_buckets(1.0, 10.0, 3).unwrap(), vec![1.0, 10.0, 100.0]);
    assert!(exponential_buckets(0.0, 2.0, 3).is_err());
    assert!(linear_buckets(0.0, 1.0, 0).is_err());
}

#[test]
fn summary_reports_nearest_rank_quantiles() {
    let registry = CollectorRegistry::new();
    let s = registry
        .summary(SummaryOpts::new("rpc_seconds", "").objectives(vec![0.0, 0.5, 0.9, 1.0]))
        .unwrap();
    for v in 1..=10 {
        s.observe(v as f64);
    }

    let PointValue::Summary(value) = only_value(&registry, "rpc_seconds") else {
        panic!("expected summary");
    };
    assert_eq!(
        value.quantiles,
        vec![(0.0, 1.0), (0.5, 5.0), (0.9, 9.0), (1.0, 10.0)]
    );
    assert_eq!(value.sum, 55.0);
    assert_eq!(value.count, 10);
}

#[test]
fn empty_summary_reports_nan_quantiles() {
    let s = Summary::new("idle_seconds", "").unwrap();
    let registry = CollectorRegistry::new();
    registry.register(s).unwrap();

    let PointValue::Summary(value) = only_value(&registry, "idle_seconds") else {
        panic!("expected summary");
    };
    assert_eq!(value.count, 0);
    assert!(value.quantiles.iter().all(|(_, v)| v.is_nan()));
}

#[test]
fn summary_objectives_are_validated() {
    assert!(Summary::with_opts(SummaryOpts::new("s", "").objectives(vec![1.5])).is_err());
    assert!(Summary::with_opts(
        SummaryOpts::new("s", "").max_age(std::time::Duration::from_secs(60), 0)
    )
    .is_err());
    // 4ns cannot be split into 5 sub-windows.
    assert!(Summary::with_opts(
        SummaryOpts::new("s", "").max_age(std::time::Duration::from_nanos(4), 5)
    )
    .is_err());
}

#[test]
fn summary_with_custom_window_reports_observations() {
    let registry = CollectorRegistry::new();
    let s = registry
        .summary(SummaryOpts::new("batch_seconds", "").max_age(std::time::Duration::from_secs(5), 5))
        .unwrap();
    s.observe(2.0);

    let PointValue::Summary(value) = only_value(&registry, "batch_seconds") else {
        panic!("expected summary");
    };
    assert_eq!(value.count, 1);
    assert!(value.quantiles.iter().all(|(_, v)| *v == 2.0));
}

#[test]
fn labelled_family_publishes_unlabelled_child_only_once_touched() {
    let registry = CollectorRegistry::new();
    let g = registry.gauge(Opts::new("temp", "").labels(&["room"])).unwrap();
    g.with_label_values(&["kitchen"]).unwrap().set(21.0);
    assert_eq!(registry.collect_all().family("temp").unwrap().points.len(), 1);

    g.set(5.0);
    let family = registry.collect_all().families.remove(0);
    assert_eq!(family.points.len(), 2);
    assert!(family.points[0].label_values.is_empty());

    assert!(g.remove_label_values(&["kitchen"]));
    assert_eq!(registry.collect_all().family("temp").unwrap().points.len(), 1);
}
