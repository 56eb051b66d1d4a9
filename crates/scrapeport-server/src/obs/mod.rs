//! Built-in metric sources.
//!
//! - `process`: standard on-demand collector for the current process
//! - `scrape`: counters and a latency histogram about the endpoint itself

pub mod process;
pub mod scrape;

pub use process::ProcessCollector;
pub use scrape::ScrapeMetrics;
