//! Event type definitions for stage notifications.

use crate::core::report::AnalysisPayload;
use crate::core::scanner::FileRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the cleanup pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scan stage events
    Scan(ScanEvent),
    /// Analyze stage events
    Analyze(AnalyzeEvent),
}

/// Progress of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageProgress {
    /// Work is under way but its total is unknown
    Indeterminate,
    /// Percentage complete (0-100)
    Percent(u8),
}

impl StageProgress {
    /// `done` out of `total`, rounded down; a zero total counts as complete
    pub fn of(done: usize, total: usize) -> Self {
        if total == 0 {
            return StageProgress::Percent(100);
        }
        StageProgress::Percent((done.min(total) * 100 / total) as u8)
    }
}

/// Events during the scan stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { roots: Vec<PathBuf> },
    /// Progress update
    Progress(StageProgress),
    /// A file was discovered
    Record(FileRecord),
    /// A root or directory could not be read; scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning finished, normally or by cancellation
    Completed {
        total_records: usize,
        cancelled: bool,
    },
    /// The stage died; no further scan events follow
    Failed { message: String },
}

/// Events during the analyze stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalyzeEvent {
    /// Analysis has started
    Started { total_records: usize },
    /// Duplicate detection finished
    Duplicates {
        exact_groups: usize,
        perceptual_groups: usize,
    },
    /// Progress update
    Progress(StageProgress),
    /// A batch of analysed records, in record order
    Batch(Vec<AnalysisPayload>),
    /// Analysis finished, normally or by cancellation
    Completed { processed: usize, cancelled: bool },
    /// The stage died; no further analyze events follow
    Failed { message: String },
}
