#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use scrapeport_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  port: 9100
  tls:
    enabeld: true # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
server:
  port: 9100
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.port, 9100);
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.path, "/metrics");
    assert_eq!(cfg.server.shutdown_grace_ms, 5000);
    assert!(cfg.server.self_metrics);
    assert!(!cfg.server.tls.enabled);
    assert!(cfg.collectors.process);
}

#[test]
fn port_is_required() {
    let bad = r#"
version: 1
server:
  host: "127.0.0.1"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn tls_enabled_without_certificate_fails() {
    let bad = r#"
version: 1
server:
  port: 9100
  tls:
    enabled: true
    cert_path: "/etc/scrapeport/cert.pem"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn bad_host_fails() {
    let bad = r#"
version: 1
server:
  host: "not a host"
  port: 9100
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn path_must_start_with_slash() {
    let bad = r#"
version: 1
server:
  port: 9100
  path: "metrics"
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn unsupported_version_fails() {
    let bad = r#"
version: 2
server:
  port: 9100
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn host_wildcards_and_localhost() {
    assert_eq!(config::parse_host("").unwrap().to_string(), "0.0.0.0");
    assert_eq!(config::parse_host("+").unwrap().to_string(), "0.0.0.0");
    assert_eq!(config::parse_host("*").unwrap().to_string(), "0.0.0.0");
    assert_eq!(config::parse_host("localhost").unwrap().to_string(), "127.0.0.1");
    assert_eq!(config::parse_host("::1").unwrap().to_string(), "::1");
}

#[test]
fn missing_file_is_configuration_error() {
    let err = config::load_from_file("/nonexistent/scrapeport.yaml").expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}
