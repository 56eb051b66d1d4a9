//! Standard process statistics, gathered with `sysinfo` at scrape time.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use scrapeport_core::error::{Result, ScrapeError};
use scrapeport_core::metric::MetricFamily;
use scrapeport_core::OnDemandCollector;

const NAME: &str = "process";

/// Reports memory, CPU and start time of the current process.
///
/// Calls are serialized on an internal mutex: `sysinfo` needs the previous
/// refresh to compute CPU usage, so overlapping scrapes take turns.
pub struct ProcessCollector {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessCollector {
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }

    /// One instance per process, so repeated registration is a no-op.
    pub fn shared() -> Arc<ProcessCollector> {
        static SHARED: OnceLock<Arc<ProcessCollector>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ProcessCollector::new())))
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl OnDemandCollector for ProcessCollector {
    fn name(&self) -> &str {
        NAME
    }

    fn collect(&self) -> Result<Vec<MetricFamily>> {
        let pid = self
            .pid
            .ok_or_else(|| ScrapeError::collector(NAME, "current pid unavailable on this platform"))?;

        let mut sys = self.system.lock();
        if !sys.refresh_process(pid) {
            return Err(ScrapeError::collector(NAME, format!("pid {pid} not found")));
        }
        let process = sys
            .process(pid)
            .ok_or_else(|| ScrapeError::collector(NAME, format!("pid {pid} not found")))?;

        Ok(vec![
            MetricFamily::gauge(
                "process_resident_memory_bytes",
                "Resident memory size in bytes.",
                process.memory() as f64,
            ),
            MetricFamily::gauge(
                "process_virtual_memory_bytes",
                "Virtual memory size in bytes.",
                process.virtual_memory() as f64,
            ),
            MetricFamily::gauge(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                process.start_time() as f64,
            ),
            MetricFamily::gauge(
                "process_cpu_usage_percent",
                "CPU usage since the previous scrape, in percent of one core.",
                f64::from(process.cpu_usage()),
            ),
            MetricFamily::gauge(
                "process_run_time_seconds",
                "Seconds since the process started.",
                process.run_time() as f64,
            ),
        ])
    }
}
