#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use scrapeport::core::metric::Opts;
use scrapeport::core::CollectorRegistry;
use scrapeport::server::MetricServer;

#[test]
fn facade_exposes_core_and_server() {
    let registry = Arc::new(CollectorRegistry::new());
    registry.counter(Opts::new("facade_total", "")).unwrap().inc();

    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(Arc::clone(&registry))
        .self_metrics(false)
        .build()
        .unwrap();

    assert!(!server.is_running());
    assert_eq!(server.path(), "/metrics");
    assert_eq!(server.registry().collect_all().samples_for("facade_total")[0].value, 1.0);
}
