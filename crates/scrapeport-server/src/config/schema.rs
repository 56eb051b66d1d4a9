use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;
use scrapeport_core::error::{Result, ScrapeError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeportConfig {
    pub version: u32,

    pub server: ServerSection,

    #[serde(default)]
    pub collectors: CollectorsSection,
}

impl ScrapeportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ScrapeError::Configuration(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default = "default_true")]
    pub self_metrics: bool,

    #[serde(default)]
    pub tls: TlsSection,
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        parse_host(&self.host)?;
        validate_path(&self.path)?;
        if self.shutdown_grace_ms > 60_000 {
            return Err(ScrapeError::Configuration(
                "server.shutdown_grace_ms must be at most 60000".into(),
            ));
        }
        self.tls.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    #[serde(default)]
    pub enabled: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsSection {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && (self.cert_path.is_none() || self.key_path.is_none()) {
            return Err(ScrapeError::Configuration(
                "server.tls.cert_path and server.tls.key_path are required when tls is enabled"
                    .into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorsSection {
    /// Register the standard process collector.
    #[serde(default = "default_true")]
    pub process: bool,
}

impl Default for CollectorsSection {
    fn default() -> Self {
        Self {
            process: default_true(),
        }
    }
}

/// Accepts an IP literal, `localhost`, or `+` / `*` / empty for all interfaces.
pub fn parse_host(host: &str) -> Result<IpAddr> {
    match host.trim() {
        "" | "+" | "*" => Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        "localhost" => Ok(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        other => other
            .parse()
            .map_err(|_| ScrapeError::Configuration(format!("invalid host address {other:?}"))),
    }
}

pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') || path.contains(char::is_whitespace) {
        return Err(ScrapeError::Configuration(format!(
            "metrics path must start with '/' and contain no whitespace, got {path:?}"
        )));
    }
    Ok(())
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_path() -> String {
    "/metrics".into()
}
fn default_shutdown_grace_ms() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}
