#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use scrapeport_core::collector::FnCollector;
use scrapeport_core::exposition::{proto, text, PROTOBUF_CONTENT_TYPE, TEXT_CONTENT_TYPE};
use scrapeport_core::metric::Opts;
use scrapeport_core::{CollectorRegistry, OnDemandCollector, ScrapeError};
use scrapeport_server::{MetricServer, ServerPhase, TlsCertificate};

const PROTOBUF_ACCEPT: &str =
    "application/vnd.google.protobuf;proto=io.prometheus.client.MetricFamily;encoding=delimited";

fn local_server(registry: Arc<CollectorRegistry>) -> MetricServer {
    MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(registry)
        .shutdown_grace(Duration::from_secs(1))
        .build()
        .expect("build")
}

async fn get(addr: SocketAddr, path: &str, accept: Option<&str>) -> reqwest::Response {
    let client = reqwest::Client::new();
    let mut req = client.get(format!("http://{addr}{path}"));
    if let Some(a) = accept {
        req = req.header("accept", a);
    }
    req.send().await.expect("request")
}

fn content_type(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[test]
fn https_without_certificate_fails_at_build() {
    let err = MetricServer::builder(0)
        .registry(Arc::new(CollectorRegistry::new()))
        .use_https(true)
        .build()
        .err()
        .expect("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn invalid_path_fails_at_build() {
    let err = MetricServer::builder(0)
        .registry(Arc::new(CollectorRegistry::new()))
        .path("metrics")
        .build()
        .err()
        .expect("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[tokio::test]
async fn serves_text_by_default() {
    let registry = Arc::new(CollectorRegistry::new());
    let g = registry.gauge(Opts::new("g1", "a gauge")).unwrap();
    g.set(3.0);

    let server = local_server(Arc::clone(&registry));
    assert_eq!(server.phase(), ServerPhase::Stopped);
    let addr = server.start().await.expect("start");
    assert!(server.is_running());
    assert_eq!(server.local_addr(), Some(addr));
    assert_ne!(addr.port(), 0);

    let resp = get(addr, "/metrics", None).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(content_type(&resp), TEXT_CONTENT_TYPE);

    let body = resp.text().await.unwrap();
    let families = text::parse(&body).expect("body parses");
    let g1 = families.iter().find(|f| f.name == "g1").expect("g1 present");
    assert_eq!(g1.samples[0].value, 3.0);
    assert!(families
        .iter()
        .any(|f| f.name == "scrapeport_scrape_requests_total"));

    server.stop().await;
}

#[tokio::test]
async fn serves_protobuf_when_negotiated() {
    let registry = Arc::new(CollectorRegistry::new());
    let c = registry.counter(Opts::new("jobs_total", "jobs")).unwrap();
    c.inc_by(2.0).unwrap();

    let server = local_server(Arc::clone(&registry));
    let addr = server.start().await.unwrap();

    let resp = get(addr, "/metrics", Some(PROTOBUF_ACCEPT)).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(content_type(&resp), PROTOBUF_CONTENT_TYPE);

    let body = resp.bytes().await.unwrap();
    let families = proto::decode_delimited(body).expect("decodes");
    let jobs = families
        .iter()
        .find(|f| f.name.as_deref() == Some("jobs_total"))
        .expect("jobs_total present");
    let value = jobs.metric[0]
        .counter
        .as_ref()
        .and_then(|c| c.value)
        .expect("counter value");
    assert_eq!(value, 2.0);

    server.stop().await;
}

#[tokio::test]
async fn other_paths_hit_fallback() {
    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .path("/custom")
        .registry(Arc::new(CollectorRegistry::new()))
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let resp = get(addr, "/metrics", None).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "metrics are served at /custom\n");

    let resp = get(addr, "/custom", None).await;
    assert_eq!(content_type(&resp), TEXT_CONTENT_TYPE);

    server.stop().await;
}

#[tokio::test]
async fn start_twice_is_already_running() {
    let server = local_server(Arc::new(CollectorRegistry::new()));
    server.start().await.unwrap();

    let err = server.start().await.expect_err("second start");
    assert!(matches!(err, ScrapeError::AlreadyRunning));
    assert_eq!(err.code().as_str(), "ALREADY_RUNNING");
    assert!(server.is_running());

    server.stop().await;
}

#[tokio::test]
async fn stop_releases_listener_and_is_idempotent() {
    let server = local_server(Arc::new(CollectorRegistry::new()));
    let addr = server.start().await.unwrap();

    server.stop().await;
    assert!(!server.is_running());
    assert_eq!(server.phase(), ServerPhase::Stopped);
    assert_eq!(server.local_addr(), None);

    let refused = reqwest::Client::new()
        .get(format!("http://{addr}/metrics"))
        .send()
        .await;
    assert!(refused.is_err());

    server.stop().await;
    assert_eq!(server.phase(), ServerPhase::Stopped);
}

#[tokio::test]
async fn stop_without_start_is_noop() {
    let server = local_server(Arc::new(CollectorRegistry::new()));
    server.stop().await;
    assert_eq!(server.phase(), ServerPhase::Stopped);
}

#[tokio::test]
async fn restart_after_stop() {
    let server = local_server(Arc::new(CollectorRegistry::new()));
    server.start().await.unwrap();
    server.stop().await;

    let addr = server.start().await.expect("restart");
    let resp = get(addr, "/metrics", None).await;
    assert_eq!(resp.status().as_u16(), 200);

    server.stop().await;
}

#[tokio::test]
async fn failing_collector_does_not_fail_scrape() {
    let registry = Arc::new(CollectorRegistry::new());
    registry.gauge(Opts::new("healthy", "")).unwrap().set(1.0);

    let broken: Arc<dyn OnDemandCollector> = Arc::new(FnCollector::new("broken", || {
        Err(ScrapeError::collector("broken", "device unavailable"))
    }));
    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(Arc::clone(&registry))
        .collectors(vec![broken])
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let resp = get(addr, "/metrics", None).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("healthy 1\n"));

    let failures = registry
        .collect_all()
        .samples_for("scrapeport_collector_failures_total");
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].labels,
        vec![("collector".to_string(), "broken".to_string())]
    );
    assert_eq!(failures[0].value, 1.0);

    server.stop().await;
}

#[tokio::test]
async fn self_metrics_can_be_disabled() {
    let registry = Arc::new(CollectorRegistry::new());
    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(Arc::clone(&registry))
        .self_metrics(false)
        .build()
        .unwrap();
    assert_eq!(registry.instrument_count(), 0);

    let addr = server.start().await.unwrap();
    let body = get(addr, "/metrics", None).await.text().await.unwrap();
    assert!(body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn invalid_tls_material_fails_at_start() {
    install_crypto_provider();
    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(Arc::new(CollectorRegistry::new()))
        .use_https(true)
        .certificate(TlsCertificate::from_pem("not a certificate", "not a key"))
        .build()
        .expect("certificate presence is enough to build");

    let err = server.start().await.expect_err("bad pem");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
    assert_eq!(server.phase(), ServerPhase::Stopped);
    assert!(!server.is_running());
}

#[test]
fn certificate_debug_hides_key() {
    let cert = TlsCertificate::from_pem("CERT", "SECRET KEY");
    let shown = format!("{cert:?}");
    assert!(!shown.contains("SECRET"));
}

// reqwest and axum-server pull in different rustls backends; pick one for the process.
fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

fn self_signed_certificate() -> TlsCertificate {
    let generated =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .expect("generate certificate");
    TlsCertificate::from_pem(generated.cert.pem(), generated.key_pair.serialize_pem())
}

#[tokio::test]
async fn https_serves_scrape_and_restarts() {
    install_crypto_provider();

    let registry = Arc::new(CollectorRegistry::new());
    let g = registry.gauge(Opts::new("g1", "")).unwrap();
    g.inc();
    g.inc();
    g.inc();

    let server = MetricServer::builder(0)
        .host("127.0.0.1")
        .registry(Arc::clone(&registry))
        .use_https(true)
        .certificate(self_signed_certificate())
        .shutdown_grace(Duration::from_secs(1))
        .build()
        .unwrap();
    let addr = server.start().await.expect("tls start");
    assert!(server.is_running());

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    let resp = client
        .get(format!("https://{addr}/metrics"))
        .send()
        .await
        .expect("https request");
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(content_type(&resp), TEXT_CONTENT_TYPE);
    let body = resp.text().await.unwrap();
    assert!(body.contains("g1 3\n"));

    server.stop().await;
    assert_eq!(server.phase(), ServerPhase::Stopped);
    let refused = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
        .get(format!("https://{addr}/metrics"))
        .send()
        .await;
    assert!(refused.is_err());

    let addr = server.start().await.expect("tls restart");
    let resp = client
        .get(format!("https://{addr}/metrics"))
        .send()
        .await
        .expect("https request after restart");
    assert_eq!(resp.status().as_u16(), 200);

    server.stop().await;
}
