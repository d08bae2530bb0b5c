//! Classifier backed by an external program.
//!
//! The program is run once per image as
//! `<command> [args..] <image path> <label,label,..>` and must print JSON on
//! stdout: either an array with one probability per label, in order, or an
//! object mapping label names to probabilities. Anything else is a failure.

use super::{Classification, ClassifierInput, ContentLabel, ImageClassifier};
use crate::error::ClassifyError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ExternalClassifier {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalClassifier {
    /// Resolve `command` (on `PATH` for bare names) without running it.
    pub fn new(command: &Path, args: Vec<String>) -> Result<Self, ClassifyError> {
        let program = which::which(command).map_err(|e| {
            ClassifyError::Unavailable(format!("{}: {}", command.display(), e))
        })?;

        Ok(Self { program, args })
    }
}

impl ImageClassifier for ExternalClassifier {
    fn name(&self) -> &str {
        "external"
    }

    fn classify(
        &self,
        input: &ClassifierInput<'_>,
        labels: &[ContentLabel],
    ) -> Result<Classification, ClassifyError> {
        let vocabulary = labels
            .iter()
            .map(ContentLabel::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input.path)
            .arg(&vocabulary)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ClassifyError::ProcessFailed {
                path: input.path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifyError::ProcessFailed {
                path: input.path.to_path_buf(),
                reason: format!("exit status {}: {}", output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(path = %input.path.display(), output = %stdout.trim(), "classifier output");

        let probabilities = parse_distribution(&stdout, labels)?;
        pick_best(labels, &probabilities)
    }
}

/// Read one probability per label out of the program's stdout.
fn parse_distribution(stdout: &str, labels: &[ContentLabel]) -> Result<Vec<f64>, ClassifyError> {
    let value: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| ClassifyError::MalformedOutput(e.to_string()))?;

    let number = |v: &Value| {
        v.as_f64()
            .filter(|p| p.is_finite())
            .ok_or_else(|| ClassifyError::MalformedOutput(format!("not a probability: {v}")))
    };

    match value {
        Value::Array(items) => {
            if items.len() != labels.len() {
                return Err(ClassifyError::LabelMismatch {
                    expected: labels.len(),
                    got: items.len(),
                });
            }
            items.iter().map(number).collect()
        }
        Value::Object(map) => {
            // Keys are matched loosely, so "Photo" and " photo" both count.
            let named: Vec<(ContentLabel, &Value)> = map
                .iter()
                .filter_map(|(key, v)| ContentLabel::from_name(key).map(|label| (label, v)))
                .collect();
            labels
                .iter()
                .map(|label| {
                    named
                        .iter()
                        .find(|(name, _)| name == label)
                        .map(|(_, v)| *v)
                        .ok_or(ClassifyError::LabelMismatch {
                            expected: labels.len(),
                            got: named.len(),
                        })
                        .and_then(number)
                })
                .collect()
        }
        other => Err(ClassifyError::MalformedOutput(format!(
            "expected an array or object, got {other}"
        ))),
    }
}

/// Arg-max; ties go to the earlier label.
fn pick_best(
    labels: &[ContentLabel],
    probabilities: &[f64],
) -> Result<Classification, ClassifyError> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((i, p)),
        }
    }

    best.map(|(i, p)| Classification::new(labels[i], p))
        .ok_or_else(|| ClassifyError::MalformedOutput("empty distribution".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::CLASSIFIER_LABELS;

    #[test]
    fn array_output_picks_highest_probability() {
        let probabilities =
            parse_distribution("[0.1, 0.05, 0.7, 0.1, 0.05]\n", &CLASSIFIER_LABELS).unwrap();
        let result = pick_best(&CLASSIFIER_LABELS, &probabilities).unwrap();

        assert_eq!(result.label, ContentLabel::Photo);
        assert!((result.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn object_output_is_matched_by_name() {
        let json = r#"{"wallpaper": 0.6, "photo": 0.2, "meme": 0.1, "document": 0.05, "screenshot": 0.05}"#;
        let probabilities = parse_distribution(json, &CLASSIFIER_LABELS).unwrap();
        let result = pick_best(&CLASSIFIER_LABELS, &probabilities).unwrap();

        assert_eq!(result.label, ContentLabel::Wallpaper);
    }

    #[test]
    fn object_keys_ignore_case_and_padding() {
        let json = r#"{"Screenshot": 0.1, " PHOTO ": 0.5, "Meme": 0.2, "wallpaper": 0.1, "Document": 0.1, "video": 0.9}"#;
        let probabilities = parse_distribution(json, &CLASSIFIER_LABELS).unwrap();
        let result = pick_best(&CLASSIFIER_LABELS, &probabilities).unwrap();

        assert_eq!(result.label, ContentLabel::Photo);
        assert!((result.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn wrong_length_is_a_label_mismatch() {
        let err = parse_distribution("[0.5, 0.5]", &CLASSIFIER_LABELS).unwrap_err();
        assert!(matches!(err, ClassifyError::LabelMismatch { expected: 5, got: 2 }));
    }

    #[test]
    fn missing_label_in_object_is_a_mismatch() {
        let err = parse_distribution(r#"{"photo": 1.0}"#, &CLASSIFIER_LABELS).unwrap_err();
        assert!(matches!(err, ClassifyError::LabelMismatch { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_distribution("not json", &CLASSIFIER_LABELS),
            Err(ClassifyError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_distribution("\"photo\"", &CLASSIFIER_LABELS),
            Err(ClassifyError::MalformedOutput(_))
        ));
    }

    #[test]
    fn ties_prefer_the_first_label() {
        let result = pick_best(&CLASSIFIER_LABELS, &[0.2; 5]).unwrap();
        assert_eq!(result.label, ContentLabel::Screenshot);
    }

    #[test]
    fn unknown_command_is_unavailable() {
        let err = ExternalClassifier::new(Path::new("definitely-not-a-real-classifier-xyz"), vec![])
            .unwrap_err();
        assert!(matches!(err, ClassifyError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn runs_a_real_program() {
        use crate::core::quality::QualityMetrics;

        let classifier = ExternalClassifier::new(
            Path::new("sh"),
            vec!["-c".to_string(), "echo '[0.1, 0.1, 0.1, 0.6, 0.1]'".to_string()],
        )
        .unwrap();
        let quality = QualityMetrics::from_measurements(800, 600, 100.0, 10.0);
        let input = ClassifierInput {
            path: Path::new("/pics/funny.png"),
            quality: &quality,
        };

        let result = classifier.classify(&input, &CLASSIFIER_LABELS).unwrap();

        assert_eq!(result.label, ContentLabel::Meme);
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_a_process_failure() {
        use crate::core::quality::QualityMetrics;

        let classifier =
            ExternalClassifier::new(Path::new("sh"), vec!["-c".to_string(), "exit 3".to_string()])
                .unwrap();
        let quality = QualityMetrics::from_measurements(800, 600, 100.0, 10.0);
        let input = ClassifierInput {
            path: Path::new("/pics/funny.png"),
            quality: &quality,
        };

        assert!(matches!(
            classifier.classify(&input, &CLASSIFIER_LABELS),
            Err(ClassifyError::ProcessFailed { .. })
        ));
    }
}
