//! Per-record analysis: quality metrics plus a content label.

use super::QualityMetrics;
use crate::core::classifier::{
    Classification, ClassifierCapability, ClassifierInput, ContentLabel, HeuristicClassifier,
};
use crate::core::hasher::decode::decode_image;
use crate::core::scanner::{FileKind, FileRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Lowercase substrings that mark a filename as a screenshot
pub const SCREENSHOT_TOKENS: &[&str] = &["screenshot", "скрін", "скрин", "скріншот"];

/// Screenshots below this resolution are not trusted to the filename rule
const SCREENSHOT_MIN: (u32, u32) = (800, 600);

const SCREENSHOT_CONFIDENCE: f64 = 0.7;
const DOCUMENT_CONFIDENCE: f64 = 0.5;
const OTHER_KIND_CONFIDENCE: f64 = 0.3;

/// Whether a base name carries a screenshot token
pub fn looks_like_screenshot(name: &str) -> bool {
    let lower = name.to_lowercase();
    SCREENSHOT_TOKENS.iter().any(|token| lower.contains(token))
}

/// Analysis of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub kind: FileKind,
    pub label: ContentLabel,
    /// In `[0, 1]`
    pub confidence: f64,
    /// Only for images that decoded
    pub quality: Option<QualityMetrics>,
}

impl AnalysisResult {
    fn new(
        kind: FileKind,
        classification: Classification,
        quality: Option<QualityMetrics>,
    ) -> Self {
        Self {
            kind,
            label: classification.label,
            confidence: classification.confidence,
            quality,
        }
    }
}

/// Labels records, consulting the optional classifier for images.
#[derive(Debug, Default)]
pub struct QualityAnalyzer {
    capability: ClassifierCapability,
    heuristics: HeuristicClassifier,
}

impl QualityAnalyzer {
    pub fn new(capability: ClassifierCapability) -> Self {
        Self {
            capability,
            heuristics: HeuristicClassifier::new(),
        }
    }

    /// Whether the external classifier is still in play
    pub fn classifier_enabled(&self) -> bool {
        self.capability.is_enabled()
    }

    pub fn analyze_record(&mut self, record: &FileRecord) -> AnalysisResult {
        match record.kind {
            FileKind::Image => self.analyze_image(&record.path, &record.name),
            FileKind::Document => AnalysisResult::new(
                record.kind,
                Classification::new(ContentLabel::Document, DOCUMENT_CONFIDENCE),
                None,
            ),
            kind => AnalysisResult::new(
                kind,
                Classification::new(ContentLabel::from_kind(kind), OTHER_KIND_CONFIDENCE),
                None,
            ),
        }
    }

    /// Decode, measure and label an image.
    ///
    /// Precedence: screenshot filename at a plausible resolution, then the
    /// external classifier, then the heuristics. Undecodable files come back
    /// as `unknown` with no metrics.
    pub fn analyze_image(&mut self, path: &Path, name: &str) -> AnalysisResult {
        let image = match decode_image(path) {
            Ok(image) => image,
            Err(e) => {
                debug!(error = %e, "image not analysed");
                return AnalysisResult::new(
                    FileKind::Image,
                    Classification::new(ContentLabel::Unknown, 0.0),
                    None,
                );
            }
        };

        let quality = QualityMetrics::measure(&image);
        drop(image);

        let classification = if looks_like_screenshot(name)
            && quality.width >= SCREENSHOT_MIN.0
            && quality.height >= SCREENSHOT_MIN.1
        {
            Classification::new(ContentLabel::Screenshot, SCREENSHOT_CONFIDENCE)
        } else {
            let input = ClassifierInput {
                path,
                quality: &quality,
            };
            self.capability
                .classify(&input)
                .unwrap_or_else(|| self.heuristics.label(&input))
        };

        AnalysisResult::new(FileKind::Image, classification, Some(quality))
    }
}
