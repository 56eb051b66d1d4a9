//! scrapeport exporter binary.
//!
//! Usage: `scrapeport [config.yaml]` (defaults to `scrapeport.yaml`).
//! Serves the default registry until Ctrl-C or SIGTERM.

use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};

use scrapeport_core::metrics;
use scrapeport_core::Result;
use scrapeport_server::{config, MetricServer};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "scrapeport exited");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "scrapeport.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let server = MetricServer::from_config(&cfg)?;
    let uptime = metrics::create_gauge(
        "scrapeport_uptime_seconds",
        "Seconds since the exporter started.",
        &[],
    )?;

    let addr = server.start().await?;
    tracing::info!(%addr, config = %path, "scrapeport started");

    let started = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => uptime.set(started.elapsed().as_secs_f64()),
            _ = &mut shutdown => break,
        }
    }

    tracing::info!("shutdown requested");
    server.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
