//! Rule-based labelling from quality metrics alone.

use super::{Classification, ClassifierInput, ContentLabel, ImageClassifier};
use crate::error::ClassifyError;

/// Minimum resolution for the wallpaper rule
const WALLPAPER_MIN: (u32, u32) = (1600, 900);

/// Fallback classifier. Never fails and ignores the label vocabulary.
///
/// Rules, first match wins:
/// 1. at least 1600x900, not dark, sharp enough: wallpaper (0.55)
/// 2. not small, not dark: photo (0.5)
/// 3. any low-quality flag: photo (0.4)
/// 4. otherwise: unknown (0.0)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn label(&self, input: &ClassifierInput<'_>) -> Classification {
        let q = input.quality;

        if q.width >= WALLPAPER_MIN.0
            && q.height >= WALLPAPER_MIN.1
            && !q.is_dark
            && !q.is_low_sharpness
        {
            Classification::new(ContentLabel::Wallpaper, 0.55)
        } else if !q.is_small && !q.is_dark {
            Classification::new(ContentLabel::Photo, 0.5)
        } else if q.is_small || q.is_dark || q.is_low_sharpness {
            Classification::new(ContentLabel::Photo, 0.4)
        } else {
            Classification::new(ContentLabel::Unknown, 0.0)
        }
    }
}

impl ImageClassifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn classify(
        &self,
        input: &ClassifierInput<'_>,
        _labels: &[ContentLabel],
    ) -> Result<Classification, ClassifyError> {
        Ok(self.label(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quality::QualityMetrics;
    use std::path::Path;

    fn classify(width: u32, height: u32, brightness: f64, sharpness: f64) -> Classification {
        let quality = QualityMetrics::from_measurements(width, height, brightness, sharpness);
        HeuristicClassifier::new().label(&ClassifierInput {
            path: Path::new("/pics/img.png"),
            quality: &quality,
        })
    }

    #[test]
    fn large_bright_sharp_image_is_wallpaper() {
        let result = classify(1920, 1080, 120.0, 20.0);
        assert_eq!(result.label, ContentLabel::Wallpaper);
        assert_eq!(result.confidence, 0.55);
    }

    #[test]
    fn large_blurry_image_is_plain_photo() {
        let result = classify(1920, 1080, 120.0, 1.0);
        assert_eq!(result.label, ContentLabel::Photo);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn small_dark_image_is_low_confidence_photo() {
        let result = classify(400, 300, 10.0, 0.0);
        assert_eq!(result.label, ContentLabel::Photo);
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn dark_large_image_is_low_confidence_photo() {
        let result = classify(2000, 2000, 20.0, 30.0);
        assert_eq!(result.label, ContentLabel::Photo);
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn never_fails() {
        let quality = QualityMetrics::from_measurements(10, 10, 0.0, 0.0);
        let input = ClassifierInput {
            path: Path::new("/x.png"),
            quality: &quality,
        };
        assert!(HeuristicClassifier::new().classify(&input, &[]).is_ok());
    }
}
