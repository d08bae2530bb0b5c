//! # Classifier Module
//!
//! Content-category labelling for images.
//!
//! Two implementations of [`ImageClassifier`] exist:
//! - [`HeuristicClassifier`] - resolution/brightness/sharpness rules, always
//!   available
//! - [`ExternalClassifier`] - hands the image to an external command that
//!   prints a probability per label
//!
//! The external one is reached only through [`ClassifierCapability`], which
//! switches itself off for the rest of the run the first time the command
//! cannot be started or returns something unusable.

mod external;
mod heuristic;

pub use external::ExternalClassifier;
pub use heuristic::HeuristicClassifier;

use crate::core::quality::QualityMetrics;
use crate::core::scanner::FileKind;
use crate::error::ClassifyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Category assigned to an analysed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLabel {
    Screenshot,
    Document,
    Photo,
    Meme,
    Wallpaper,
    Unknown,
    Video,
    Audio,
    Archive,
    Other,
}

/// Vocabulary handed to the external classifier, in this order
pub const CLASSIFIER_LABELS: [ContentLabel; 5] = [
    ContentLabel::Screenshot,
    ContentLabel::Document,
    ContentLabel::Photo,
    ContentLabel::Meme,
    ContentLabel::Wallpaper,
];

impl ContentLabel {
    /// Fixed label for a non-image kind
    pub fn from_kind(kind: FileKind) -> Self {
        match kind {
            FileKind::Image => ContentLabel::Unknown,
            FileKind::Document => ContentLabel::Document,
            FileKind::Video => ContentLabel::Video,
            FileKind::Audio => ContentLabel::Audio,
            FileKind::Archive => ContentLabel::Archive,
            FileKind::Other => ContentLabel::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLabel::Screenshot => "screenshot",
            ContentLabel::Document => "document",
            ContentLabel::Photo => "photo",
            ContentLabel::Meme => "meme",
            ContentLabel::Wallpaper => "wallpaper",
            ContentLabel::Unknown => "unknown",
            ContentLabel::Video => "video",
            ContentLabel::Audio => "audio",
            ContentLabel::Archive => "archive",
            ContentLabel::Other => "other",
        }
    }

    /// Parse one of the classifier vocabulary names
    pub fn from_name(name: &str) -> Option<Self> {
        CLASSIFIER_LABELS
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for ContentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label with its confidence in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: ContentLabel,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: ContentLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// What a classifier gets to look at
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub path: &'a Path,
    pub quality: &'a QualityMetrics,
}

/// Assigns a content label to a decoded image
pub trait ImageClassifier: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Pick the best label among `labels`.
    fn classify(
        &self,
        input: &ClassifierInput<'_>,
        labels: &[ContentLabel],
    ) -> Result<Classification, ClassifyError>;
}

/// Settings for the optional external classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Try the external classifier before the heuristics
    pub enabled: bool,
    /// Program to run; looked up on `PATH` when it is a bare name
    pub command: Option<PathBuf>,
    /// Extra arguments placed before the image path and label list
    pub args: Vec<String>,
}

/// Best-effort access to an external classifier.
///
/// Disabled capabilities return `None` from every call. An enabled one that
/// fails once becomes disabled and stays that way.
#[derive(Default)]
pub struct ClassifierCapability {
    inner: Option<Box<dyn ImageClassifier>>,
}

impl ClassifierCapability {
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Wrap an arbitrary classifier
    pub fn with_classifier(classifier: Box<dyn ImageClassifier>) -> Self {
        Self {
            inner: Some(classifier),
        }
    }

    /// Build from configuration. A missing or unresolvable command leaves the
    /// capability disabled.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let Some(command) = config.command.as_deref() else {
            warn!("classifier enabled without a command; using heuristics");
            return Self::disabled();
        };

        match ExternalClassifier::new(command, config.args.clone()) {
            Ok(classifier) => {
                info!(command = %command.display(), "external classifier enabled");
                Self::with_classifier(Box::new(classifier))
            }
            Err(e) => {
                warn!(error = %e, "external classifier unavailable; using heuristics");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Classify against [`CLASSIFIER_LABELS`]; `None` when disabled or on
    /// failure, which also disables the capability.
    pub fn classify(&mut self, input: &ClassifierInput<'_>) -> Option<Classification> {
        let classifier = self.inner.as_ref()?;
        match classifier.classify(input, &CLASSIFIER_LABELS) {
            Ok(classification) => Some(classification),
            Err(e) => {
                warn!(
                    classifier = classifier.name(),
                    path = %input.path.display(),
                    error = %e,
                    "classifier failed; disabled for the rest of the run"
                );
                self.inner = None;
                None
            }
        }
    }
}

impl std::fmt::Debug for ClassifierCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierCapability")
            .field("classifier", &self.inner.as_ref().map(|c| c.name()))
            .finish()
    }
}
