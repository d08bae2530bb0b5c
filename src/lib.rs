//! # Cleanup Advisor
//!
//! Inventories directory trees and suggests what could be cleaned up.
//!
//! ## Core Philosophy
//! - **Never touch files** - the advisor only recommends; moving or deleting
//!   is left to whoever reads the report
//! - **Explain every suggestion** - each recommendation carries its reasons
//! - **Degrade locally** - one unreadable file never aborts a run
//!
//! ## Architecture
//! - `core` - Scanning, duplicate detection, quality analysis and
//!   recommendations, run as two cancellable stages
//! - `events` - Streaming progress and results to any front end
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CleanupError, Result};

/// Initialize tracing for the application, filtered by `RUST_LOG`.
///
/// Logs go to stderr so they never mix with report output. Does nothing if
/// a global subscriber is already installed.
pub fn init_tracing() {
    let _ = try_init_tracing();
}

/// Like [`init_tracing`], but reports whether installation failed
pub fn try_init_tracing() -> std::result::Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
