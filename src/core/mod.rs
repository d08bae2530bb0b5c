//! # Core Module
//!
//! The front-end-agnostic cleanup engine.
//!
//! ## Modules
//! - `scanner` - Inventories directory trees
//! - `hasher` - Content digests and perceptual fingerprints
//! - `duplicates` - Exact and near-duplicate grouping
//! - `quality` - Image measurements and per-record labelling
//! - `classifier` - Optional content-category classifier
//! - `recommend` - Rule-based cleanup suggestions
//! - `report` - Payloads, summaries, filters and export
//! - `pipeline` - Two-stage orchestration with cancellation

pub mod cancel;
pub mod classifier;
pub mod duplicates;
pub mod hasher;
pub mod pipeline;
pub mod quality;
pub mod recommend;
pub mod report;
pub mod scanner;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use classifier::{Classification, ContentLabel};
pub use duplicates::{DuplicateGroup, MatchKind};
pub use quality::{AnalysisResult, QualityMetrics};
pub use recommend::{Action, Recommendation};
pub use report::AnalysisPayload;
pub use scanner::{FileKind, FileRecord};
