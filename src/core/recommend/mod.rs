//! # Recommendation Module
//!
//! Turns a record, its analysis and its duplicate count into a suggested
//! action. Nothing here touches the filesystem.
//!
//! Rules run in a fixed order. Each match appends a reason and adds its
//! weight to the score. The first five overwrite the action; the archive and
//! document rules only fill it in when nothing else has.

use crate::core::classifier::ContentLabel;
use crate::core::quality::AnalysisResult;
use crate::core::scanner::{FileKind, FileRecord};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Case-insensitive filename fragments of temporary files
pub const TEMP_PATTERNS: &[&str] = &["~$", ".tmp", ".temp", ".partial"];

const SCREENSHOT_MAX_AGE_DAYS: f64 = 30.0;
const DOWNLOAD_MAX_AGE_DAYS: f64 = 90.0;
const DOCUMENT_MAX_AGE_DAYS: f64 = 180.0;
const LARGE_ARCHIVE_BYTES: u64 = 200 * 1024 * 1024;

pub const REASON_TEMPORARY: &str = "Temporary-looking filename";
pub const REASON_OLD_SCREENSHOT: &str = "Screenshot older than 30 days";
pub const REASON_OLD_DOWNLOAD: &str = "Old file in Downloads (> 90 days)";
pub const REASON_DUPLICATE: &str = "Duplicate detected";
pub const REASON_LOW_QUALITY: &str = "Low-quality image";
pub const REASON_LARGE_ARCHIVE: &str = "Large archive; consider moving";
pub const REASON_OLD_DOCUMENT: &str = "Old document";
pub const REASON_NONE: &str = "No issues detected";

/// Suggested action for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Delete,
    DeleteDuplicates,
    Move,
    Compress,
    #[default]
    Ignore,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Delete => "delete",
            Action::DeleteDuplicates => "delete-duplicates",
            Action::Move => "move",
            Action::Compress => "compress",
            Action::Ignore => "ignore",
        }
    }

    /// Whether acting on it frees space
    pub fn is_delete(&self) -> bool {
        matches!(self, Action::Delete | Action::DeleteDuplicates)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a file, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub primary_action: Action,
    pub reasons: Vec<String>,
    pub score: i32,
}

impl Recommendation {
    fn empty() -> Self {
        Self {
            primary_action: Action::Ignore,
            reasons: Vec::new(),
            score: 0,
        }
    }

    fn apply(&mut self, reason: &str, action: Action, weight: i32) {
        self.reasons.push(reason.to_string());
        self.primary_action = action;
        self.score += weight;
    }

    fn apply_if_unset(&mut self, reason: &str, action: Action, weight: i32) {
        self.reasons.push(reason.to_string());
        if self.primary_action == Action::Ignore {
            self.primary_action = action;
        }
        self.score += weight;
    }
}

/// Whether a base name looks like a temporary file
pub fn looks_temporary(name: &str) -> bool {
    let lower = name.to_lowercase();
    TEMP_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Whether a path runs through a `downloads` directory
pub fn in_downloads_path(path: &Path) -> bool {
    static DOWNLOADS: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = DOWNLOADS.get_or_init(|| Regex::new(r"(?i)[/\\]downloads[/\\]").ok());
    match pattern {
        Some(regex) => regex.is_match(&path.to_string_lossy()),
        None => false,
    }
}

/// Rule engine; `now` is the evaluation time used for file ages.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationEngine {
    now: DateTime<Utc>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Evaluate ages relative to a fixed instant
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Days since `mtime`, fractional. An unknown time counts as brand new.
    pub fn age_days(&self, mtime: Option<DateTime<Utc>>) -> f64 {
        match mtime {
            Some(mtime) => (self.now - mtime).num_milliseconds() as f64 / 86_400_000.0,
            None => 0.0,
        }
    }

    pub fn recommend(
        &self,
        record: &FileRecord,
        analysis: &AnalysisResult,
        dup_count: usize,
    ) -> Recommendation {
        let age = self.age_days(record.mtime);
        let mut rec = Recommendation::empty();

        if looks_temporary(&record.name) {
            rec.apply(REASON_TEMPORARY, Action::Delete, 3);
        }

        if analysis.label == ContentLabel::Screenshot && age > SCREENSHOT_MAX_AGE_DAYS {
            rec.apply(REASON_OLD_SCREENSHOT, Action::Delete, 2);
        }

        if in_downloads_path(&record.path) && age > DOWNLOAD_MAX_AGE_DAYS {
            rec.apply(REASON_OLD_DOWNLOAD, Action::Delete, 2);
        }

        if dup_count > 0 {
            rec.apply(REASON_DUPLICATE, Action::DeleteDuplicates, 3);
        }

        let low_quality = analysis.quality.is_some_and(|q| q.is_low_quality());
        if matches!(analysis.label, ContentLabel::Photo | ContentLabel::Wallpaper) && low_quality {
            rec.apply(REASON_LOW_QUALITY, Action::Delete, 2);
        }

        if record.kind == FileKind::Archive && record.size > LARGE_ARCHIVE_BYTES {
            rec.apply_if_unset(REASON_LARGE_ARCHIVE, Action::Move, 1);
        }

        if record.kind == FileKind::Document && age > DOCUMENT_MAX_AGE_DAYS && record.size > 0 {
            rec.apply_if_unset(REASON_OLD_DOCUMENT, Action::Compress, 1);
        }

        if rec.reasons.is_empty() {
            rec.reasons.push(REASON_NONE.to_string());
        }
        rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quality::QualityMetrics;
    use chrono::Duration;
    use std::path::PathBuf;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(path: &str, kind: FileKind, size: u64, age_days: i64) -> FileRecord {
        let path = PathBuf::from(path);
        FileRecord {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            ext: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
            path,
            size,
            mtime: Some(now() - Duration::days(age_days)),
            ctime: Some(now() - Duration::days(age_days)),
            kind,
            content_hash: None,
            perceptual_hash: None,
        }
    }

    fn analysis(
        kind: FileKind,
        label: ContentLabel,
        quality: Option<QualityMetrics>,
    ) -> AnalysisResult {
        AnalysisResult {
            kind,
            label,
            confidence: 0.5,
            quality,
        }
    }

    fn plain(kind: FileKind) -> AnalysisResult {
        analysis(kind, ContentLabel::from_kind(kind), None)
    }

    #[test]
    fn temporary_file_is_deleted() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/home/me/tempfile.tmp", FileKind::Other, 10, 0),
            &plain(FileKind::Other),
            0,
        );

        assert_eq!(rec.primary_action, Action::Delete);
        assert!(rec.reasons.contains(&REASON_TEMPORARY.to_string()));
        assert_eq!(rec.score, 3);
    }

    #[test]
    fn office_lock_file_is_temporary() {
        assert!(looks_temporary("~$Budget.xlsx"));
        assert!(looks_temporary("movie.mkv.PARTIAL"));
        assert!(!looks_temporary("template.docx"));
    }

    #[test]
    fn clean_file_is_ignored() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/home/me/song.mp3", FileKind::Audio, 10, 5),
            &plain(FileKind::Audio),
            0,
        );

        assert_eq!(rec.primary_action, Action::Ignore);
        assert_eq!(rec.reasons, vec![REASON_NONE.to_string()]);
        assert_eq!(rec.score, 0);
    }

    #[test]
    fn old_screenshot_is_deleted_but_recent_one_is_not() {
        let engine = RecommendationEngine::at(now());
        let screenshot = analysis(
            FileKind::Image,
            ContentLabel::Screenshot,
            Some(QualityMetrics::from_measurements(1920, 1080, 120.0, 20.0)),
        );

        let old = engine.recommend(
            &record("/pics/Screenshot_1.png", FileKind::Image, 10, 31),
            &screenshot,
            0,
        );
        let fresh = engine.recommend(
            &record("/pics/Screenshot_2.png", FileKind::Image, 10, 29),
            &screenshot,
            0,
        );

        assert_eq!(old.primary_action, Action::Delete);
        assert_eq!(old.reasons, vec![REASON_OLD_SCREENSHOT.to_string()]);
        assert_eq!(fresh.primary_action, Action::Ignore);
    }

    #[test]
    fn downloads_path_detection() {
        assert!(in_downloads_path(Path::new("/home/me/Downloads/setup.exe")));
        assert!(in_downloads_path(Path::new(r"C:\Users\me\downloads\setup.exe")));
        assert!(!in_downloads_path(Path::new("/home/me/downloads_backup/setup.exe")));
        assert!(!in_downloads_path(Path::new("/home/me/Documents/setup.exe")));
    }

    #[test]
    fn old_download_is_deleted() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/home/me/Downloads/setup.bin", FileKind::Other, 10, 100),
            &plain(FileKind::Other),
            0,
        );

        assert_eq!(rec.primary_action, Action::Delete);
        assert_eq!(rec.reasons, vec![REASON_OLD_DOWNLOAD.to_string()]);
    }

    #[test]
    fn duplicate_overrides_earlier_action() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/home/me/Downloads/copy.tmp", FileKind::Other, 10, 100),
            &plain(FileKind::Other),
            2,
        );

        assert_eq!(rec.primary_action, Action::DeleteDuplicates);
        assert_eq!(rec.score, 3 + 2 + 3);
        assert_eq!(rec.reasons.len(), 3);
    }

    #[test]
    fn small_dark_photo_is_low_quality() {
        let engine = RecommendationEngine::at(now());
        let photo = analysis(
            FileKind::Image,
            ContentLabel::Photo,
            Some(QualityMetrics::from_measurements(400, 300, 10.0, 20.0)),
        );

        let rec = engine.recommend(&record("/pics/night.png", FileKind::Image, 10, 1), &photo, 0);

        assert_eq!(rec.primary_action, Action::Delete);
        assert!(rec.reasons.contains(&REASON_LOW_QUALITY.to_string()));
    }

    #[test]
    fn screenshot_label_is_not_judged_on_quality() {
        let engine = RecommendationEngine::at(now());
        let screenshot = analysis(
            FileKind::Image,
            ContentLabel::Screenshot,
            Some(QualityMetrics::from_measurements(400, 300, 10.0, 1.0)),
        );

        let rec = engine.recommend(
            &record("/pics/screen.png", FileKind::Image, 10, 1),
            &screenshot,
            0,
        );

        assert_eq!(rec.primary_action, Action::Ignore);
    }

    #[test]
    fn large_archive_is_moved() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/backup/big.zip", FileKind::Archive, 300 * 1024 * 1024, 1),
            &plain(FileKind::Archive),
            0,
        );

        assert_eq!(rec.primary_action, Action::Move);
        assert_eq!(rec.score, 1);
    }

    #[test]
    fn archive_rule_does_not_override_duplicate() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/backup/big.zip", FileKind::Archive, 300 * 1024 * 1024, 1),
            &plain(FileKind::Archive),
            1,
        );

        assert_eq!(rec.primary_action, Action::DeleteDuplicates);
        assert!(rec.reasons.contains(&REASON_LARGE_ARCHIVE.to_string()));
        assert_eq!(rec.score, 4);
    }

    #[test]
    fn old_document_is_compressed_unless_something_else_applies() {
        let engine = RecommendationEngine::at(now());
        let doc = record("/docs/report.pdf", FileKind::Document, 2048, 200);

        let alone = engine.recommend(&doc, &plain(FileKind::Document), 0);
        let duplicated = engine.recommend(&doc, &plain(FileKind::Document), 1);

        assert_eq!(alone.primary_action, Action::Compress);
        assert_eq!(alone.reasons, vec![REASON_OLD_DOCUMENT.to_string()]);
        assert_eq!(duplicated.primary_action, Action::DeleteDuplicates);
    }

    #[test]
    fn empty_old_document_is_left_alone() {
        let engine = RecommendationEngine::at(now());
        let rec = engine.recommend(
            &record("/docs/empty.txt", FileKind::Document, 0, 400),
            &plain(FileKind::Document),
            0,
        );

        assert_eq!(rec.primary_action, Action::Ignore);
    }

    #[test]
    fn age_is_fractional() {
        let engine = RecommendationEngine::at(now());
        let age = engine.age_days(Some(now() - Duration::hours(36)));
        assert!((age - 1.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_mtime_counts_as_new() {
        let engine = RecommendationEngine::at(now());
        let mut old_screenshot =
            record("/home/me/Downloads/Screenshot_1.png", FileKind::Image, 10, 400);
        old_screenshot.mtime = None;
        let screenshot = analysis(FileKind::Image, ContentLabel::Screenshot, None);

        let rec = engine.recommend(&old_screenshot, &screenshot, 0);

        assert_eq!(engine.age_days(None), 0.0);
        assert_eq!(rec.primary_action, Action::Ignore);
        assert_eq!(rec.reasons, vec![REASON_NONE.to_string()]);
    }

    #[test]
    fn action_serializes_kebab_case() {
        let json = serde_json::to_string(&Action::DeleteDuplicates).unwrap();
        assert_eq!(json, "\"delete-duplicates\"");
    }
}
