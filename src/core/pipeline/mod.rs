//! # Pipeline Module
//!
//! Runs the advisor in two cancellable stages.
//!
//! ## Stages
//! 1. **Scan** - Walk the roots and stream one record per file
//! 2. **Analyze** - Find duplicates, measure and label every record,
//!    recommend an action and stream the results in batches
//!
//! Each stage runs on its own worker thread and reports through
//! [`crate::events`]. Cancellation is cooperative: workers check the token
//! between items and finish with a `Completed { cancelled: true }` event.
//!
//! ## Example
//! ```rust,ignore
//! use cleanup_advisor::core::pipeline::{Orchestrator, PipelineBuilder};
//!
//! let config = PipelineBuilder::new().roots(vec!["/home/me/Downloads".into()]).build()?;
//! let report = Orchestrator::new(config)?.run_blocking()?;
//! println!("{} files analysed", report.payloads.len());
//! ```

mod config;
mod orchestrator;
mod stages;

pub use config::{
    CleanupConfig, PipelineBuilder, DEFAULT_BATCH_SIZE, DEFAULT_PERCEPTUAL_THRESHOLD,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, FAST_MODE_THRESHOLD,
};
pub use orchestrator::{CancelHandle, Orchestrator, RunOutcome, RunReport, ScanSummary};
pub use stages::{run_analyze_stage, run_scan_stage, AnalyzeOutcome, ScanOutcome};
