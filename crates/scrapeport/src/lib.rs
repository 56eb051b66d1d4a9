//! Top-level facade crate for scrapeport.
//!
//! Re-exports the core metric model and the HTTP server so users can depend on a single crate.

pub mod core {
    pub use scrapeport_core::*;
}

pub mod server {
    pub use scrapeport_server::*;
}
