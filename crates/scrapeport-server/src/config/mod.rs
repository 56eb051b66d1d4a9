//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use scrapeport_core::error::{Result, ScrapeError};

pub use schema::{parse_host, validate_path, CollectorsSection, ScrapeportConfig, ServerSection, TlsSection};

pub fn load_from_file(path: &str) -> Result<ScrapeportConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ScrapeError::Configuration(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ScrapeportConfig> {
    let cfg: ScrapeportConfig = serde_yaml::from_str(s)
        .map_err(|e| ScrapeError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
