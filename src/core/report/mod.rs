//! # Report Module
//!
//! Shapes analysis output for whoever consumes it.
//!
//! ## Features
//! - **Payloads**: one [`AnalysisPayload`] per record, as streamed in batches
//! - **Summary**: counts per kind and action, reclaimable bytes
//! - **Filters**: the result views a front end offers
//! - **Export**: CSV and JSON writers

mod export;

pub use export::{export_csv, export_json, export_to_file, ExportFormat};

use crate::core::classifier::ContentLabel;
use crate::core::quality::AnalysisResult;
use crate::core::recommend::{Recommendation, REASON_LOW_QUALITY, REASON_OLD_DOWNLOAD};
use crate::core::scanner::FileKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything known about one analysed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub path: PathBuf,
    pub analysis: AnalysisResult,
    pub recommendation: Recommendation,
    pub dup_count: usize,
    /// File size in bytes
    pub size: u64,
}

impl AnalysisPayload {
    pub fn kind(&self) -> FileKind {
        self.analysis.kind
    }

    fn has_reason(&self, reason: &str) -> bool {
        self.recommendation.reasons.iter().any(|r| r == reason)
    }
}

/// Result views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultFilter {
    #[default]
    All,
    Images,
    Documents,
    Screenshots,
    LowQuality,
    OldDownloads,
    RecommendedDelete,
}

impl ResultFilter {
    pub fn matches(&self, payload: &AnalysisPayload) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Images => payload.kind() == FileKind::Image,
            ResultFilter::Documents => payload.kind() == FileKind::Document,
            ResultFilter::Screenshots => payload.analysis.label == ContentLabel::Screenshot,
            ResultFilter::LowQuality => payload.has_reason(REASON_LOW_QUALITY),
            ResultFilter::OldDownloads => payload.has_reason(REASON_OLD_DOWNLOAD),
            ResultFilter::RecommendedDelete => payload.recommendation.primary_action.is_delete(),
        }
    }

    /// Keep the payloads this view shows
    pub fn apply<'a>(&self, payloads: &'a [AnalysisPayload]) -> Vec<&'a AnalysisPayload> {
        payloads.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Totals over one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_action: BTreeMap<String, usize>,
    /// Records with at least one duplicate
    pub with_duplicates: usize,
    /// Bytes freed by following every delete suggestion
    pub reclaimable_bytes: u64,
}

impl RunSummary {
    pub fn from_payloads(payloads: &[AnalysisPayload]) -> Self {
        let mut summary = Self::default();
        for payload in payloads {
            summary.add(payload);
        }
        summary
    }

    pub fn add(&mut self, payload: &AnalysisPayload) {
        self.total_records += 1;
        *self
            .by_kind
            .entry(payload.kind().as_str().to_string())
            .or_insert(0) += 1;
        *self
            .by_action
            .entry(payload.recommendation.primary_action.as_str().to_string())
            .or_insert(0) += 1;
        if payload.dup_count > 0 {
            self.with_duplicates += 1;
        }
        if payload.recommendation.primary_action.is_delete() {
            self.reclaimable_bytes += payload.size;
        }
    }
}

/// Format bytes as a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// The usual clutter folders of the current user that exist on disk
pub fn default_user_roots() -> Vec<PathBuf> {
    [
        dirs::download_dir(),
        dirs::desktop_dir(),
        dirs::document_dir(),
        dirs::picture_dir(),
        dirs::video_dir(),
    ]
    .into_iter()
    .flatten()
    .filter(|dir| dir.is_dir())
    .collect()
}
