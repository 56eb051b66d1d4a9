//! `MetricServer`: binds the scrape endpoint and manages its lifecycle.
//!
//! Phases: `Stopped -> Starting -> Running -> Stopping -> Stopped`.
//! `start` and `stop` are serialized on an async mutex; `is_running` and
//! `phase` are lock-free reads.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use scrapeport_core::error::{Result, ScrapeError};
use scrapeport_core::registry::{default_registry, is_default_registry};
use scrapeport_core::{CollectorRegistry, OnDemandCollector};

use crate::app_state::ScrapeState;
use crate::config::{parse_host, validate_path, ScrapeportConfig};
use crate::obs::{ProcessCollector, ScrapeMetrics};
use crate::router;

const DEFAULT_PATH: &str = "/metrics";
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerPhase {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ServerPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ServerPhase::Starting,
            2 => ServerPhase::Running,
            3 => ServerPhase::Stopping,
            _ => ServerPhase::Stopped,
        }
    }
}

/// PEM-encoded certificate chain and private key for HTTPS.
#[derive(Clone)]
pub struct TlsCertificate {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl TlsCertificate {
    pub fn from_pem(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    pub fn from_pem_files(cert: impl AsRef<Path>, key: impl AsRef<Path>) -> Result<Self> {
        let read = |p: &Path| {
            std::fs::read(p).map_err(|e| {
                ScrapeError::Configuration(format!("read {} failed: {e}", p.display()))
            })
        };
        Ok(Self {
            cert_pem: read(cert.as_ref())?,
            key_pem: read(key.as_ref())?,
        })
    }
}

impl fmt::Debug for TlsCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCertificate")
            .field("cert_pem_len", &self.cert_pem.len())
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

pub struct MetricServerBuilder {
    host: String,
    port: u16,
    path: String,
    registry: Option<Arc<CollectorRegistry>>,
    collectors: Option<Vec<Arc<dyn OnDemandCollector>>>,
    use_https: bool,
    certificate: Option<TlsCertificate>,
    shutdown_grace: Duration,
    self_metrics: bool,
}

impl MetricServerBuilder {
    /// Host address; defaults to all interfaces.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Scrape path; defaults to `/metrics`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Registry to expose; defaults to the process-wide registry.
    pub fn registry(mut self, registry: Arc<CollectorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// On-demand collectors to register. Without this call the default
    /// registry gets the shared process collector and custom registries get none.
    pub fn collectors(mut self, collectors: Vec<Arc<dyn OnDemandCollector>>) -> Self {
        self.collectors = Some(collectors);
        self
    }

    pub fn use_https(mut self, enabled: bool) -> Self {
        self.use_https = enabled;
        self
    }

    pub fn certificate(mut self, certificate: TlsCertificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// How long `stop` waits for in-flight scrapes before aborting them.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Register the endpoint's own request/latency metrics (default on).
    pub fn self_metrics(mut self, enabled: bool) -> Self {
        self.self_metrics = enabled;
        self
    }

    /// Validate parameters and register collectors. No socket is bound here.
    pub fn build(self) -> Result<MetricServer> {
        if self.use_https && self.certificate.is_none() {
            return Err(ScrapeError::Configuration(
                "certificate is required when using https".into(),
            ));
        }
        let host = parse_host(&self.host)?;
        validate_path(&self.path)?;

        let registry = self
            .registry
            .unwrap_or_else(|| Arc::clone(default_registry()));

        let collectors = match self.collectors {
            Some(c) => c,
            None if is_default_registry(&registry) => {
                vec![ProcessCollector::shared() as Arc<dyn OnDemandCollector>]
            }
            None => Vec::new(),
        };
        registry.register_on_demand_collectors(collectors);

        let scrape_metrics = if self.self_metrics {
            Some(ScrapeMetrics::register(&registry)?)
        } else {
            None
        };

        let tls = if self.use_https { self.certificate } else { None };

        Ok(MetricServer {
            host,
            port: self.port,
            tls,
            shutdown_grace: self.shutdown_grace,
            state: ScrapeState::new(registry, self.path, scrape_metrics),
            listener: Mutex::new(None),
            phase: AtomicU8::new(ServerPhase::Stopped as u8),
            local_addr: parking_lot::Mutex::new(None),
        })
    }
}

enum Shutdown {
    Plain(oneshot::Sender<()>),
    Tls(axum_server::Handle),
}

impl Shutdown {
    fn trigger(self, grace: Duration) {
        match self {
            Shutdown::Plain(tx) => {
                let _ = tx.send(());
            }
            Shutdown::Tls(handle) => handle.graceful_shutdown(Some(grace)),
        }
    }
}

struct RunningListener {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
}

pub struct MetricServer {
    host: IpAddr,
    port: u16,
    tls: Option<TlsCertificate>,
    shutdown_grace: Duration,
    state: ScrapeState,
    listener: Mutex<Option<RunningListener>>,
    phase: AtomicU8,
    local_addr: parking_lot::Mutex<Option<SocketAddr>>,
}

impl MetricServer {
    /// Builder for a server on `port` (0 picks an ephemeral port at start).
    pub fn builder(port: u16) -> MetricServerBuilder {
        MetricServerBuilder {
            host: "+".into(),
            port,
            path: DEFAULT_PATH.into(),
            registry: None,
            collectors: None,
            use_https: false,
            certificate: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            self_metrics: true,
        }
    }

    /// Server on the default registry, configured from a loaded config file.
    pub fn from_config(cfg: &ScrapeportConfig) -> Result<Self> {
        let s = &cfg.server;
        let mut builder = Self::builder(s.port)
            .host(s.host.clone())
            .path(s.path.clone())
            .shutdown_grace(Duration::from_millis(s.shutdown_grace_ms))
            .self_metrics(s.self_metrics);

        if s.tls.enabled {
            builder = builder.use_https(true);
            if let (Some(cert), Some(key)) = (&s.tls.cert_path, &s.tls.key_path) {
                builder = builder.certificate(TlsCertificate::from_pem_files(cert, key)?);
            }
        }

        let collectors: Vec<Arc<dyn OnDemandCollector>> = if cfg.collectors.process {
            vec![ProcessCollector::shared() as Arc<dyn OnDemandCollector>]
        } else {
            Vec::new()
        };

        builder.collectors(collectors).build()
    }

    pub fn registry(&self) -> Arc<CollectorRegistry> {
        self.state.registry()
    }

    pub fn path(&self) -> &str {
        self.state.path()
    }

    pub fn phase(&self) -> ServerPhase {
        ServerPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// True while a listener is bound and serving.
    pub fn is_running(&self) -> bool {
        self.phase() == ServerPhase::Running
    }

    /// Address actually bound, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    fn set_phase(&self, phase: ServerPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Bind the listener and start serving. Fails with `AlreadyRunning`
    /// unless stopped; on bind or TLS failure the server stays stopped.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut slot = self.listener.lock().await;
        if slot.is_some() || self.phase() != ServerPhase::Stopped {
            return Err(ScrapeError::AlreadyRunning);
        }

        self.set_phase(ServerPhase::Starting);
        match self.bind().await {
            Ok(running) => {
                let addr = running.local_addr;
                *self.local_addr.lock() = Some(addr);
                *slot = Some(running);
                self.set_phase(ServerPhase::Running);
                tracing::info!(%addr, path = %self.path(), tls = self.tls.is_some(), "metric server listening");
                Ok(addr)
            }
            Err(e) => {
                self.set_phase(ServerPhase::Stopped);
                tracing::warn!(error = %e, "metric server failed to start");
                Err(e)
            }
        }
    }

    async fn bind(&self) -> Result<RunningListener> {
        let addr = SocketAddr::new(self.host, self.port);
        let app = router::build_router(self.state.clone());

        match &self.tls {
            None => {
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|e| ScrapeError::Io(format!("bind {addr} failed: {e}")))?;
                let local_addr = listener.local_addr()?;

                let (tx, rx) = oneshot::channel::<()>();
                let task = tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move {
                            let _ = rx.await;
                        })
                        .await
                });

                Ok(RunningListener {
                    local_addr,
                    shutdown: Shutdown::Plain(tx),
                    task,
                })
            }
            Some(cert) => {
                // Load TLS material before binding so a bad certificate never opens a socket.
                let config = RustlsConfig::from_pem(cert.cert_pem.clone(), cert.key_pem.clone())
                    .await
                    .map_err(|e| ScrapeError::Configuration(format!("invalid TLS certificate: {e}")))?;

                let listener = std::net::TcpListener::bind(addr)
                    .map_err(|e| ScrapeError::Io(format!("bind {addr} failed: {e}")))?;
                listener.set_nonblocking(true)?;
                let local_addr = listener.local_addr()?;

                let handle = axum_server::Handle::new();
                let server = axum_server::from_tcp_rustls(listener, config).handle(handle.clone());
                let task = tokio::spawn(async move { server.serve(app.into_make_service()).await });

                Ok(RunningListener {
                    local_addr,
                    shutdown: Shutdown::Tls(handle),
                    task,
                })
            }
        }
    }

    /// Release the listener. Idempotent and never fails; in-flight scrapes get
    /// the shutdown grace period before the serving task is aborted.
    pub async fn stop(&self) {
        let mut slot = self.listener.lock().await;
        let Some(running) = slot.take() else { return; };

        self.set_phase(ServerPhase::Stopping);
        let RunningListener {
            local_addr,
            shutdown,
            mut task,
        } = running;

        shutdown.trigger(self.shutdown_grace);
        match tokio::time::timeout(self.shutdown_grace, &mut task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "metric server exited with error"),
            Ok(Err(e)) => tracing::warn!(error = %e, "metric server task failed"),
            Err(_) => {
                tracing::warn!(%local_addr, "graceful shutdown timed out, aborting");
                task.abort();
                // Wait for the cancelled task to drop its listener.
                let _ = task.await;
            }
        }

        *self.local_addr.lock() = None;
        self.set_phase(ServerPhase::Stopped);
        tracing::info!(%local_addr, "metric server stopped");
    }
}

impl Drop for MetricServer {
    fn drop(&mut self) {
        if let Some(running) = self.listener.get_mut().take() {
            running.shutdown.trigger(self.shutdown_grace);
        }
    }
}
