//! Pipeline configuration and its builder.

use crate::core::classifier::ClassifierConfig;
use crate::core::hasher::{ContentHashAlgorithm, ContentHasher, DEFAULT_CHUNK_SIZE};
use crate::core::scanner::{ExclusionPolicy, ScanConfig};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hamming threshold for near-duplicate images
pub const DEFAULT_PERCEPTUAL_THRESHOLD: u32 = 5;
/// Fast mode never uses a looser threshold than this
pub const FAST_MODE_THRESHOLD: u32 = 4;
/// Payloads per analyze batch
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// How long a new run waits for the previous workers to exit
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 3000;

/// Everything the pipeline can be told.
///
/// Missing fields in a JSON file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    pub hash_algorithm: ContentHashAlgorithm,
    pub hash_chunk_size: usize,
    /// Hash every file while scanning instead of only size collisions
    pub compute_hash_on_scan: bool,
    pub perceptual_threshold: u32,
    /// Prune noisy directories, tighten and subsample perceptual matching
    pub fast_mode: bool,
    /// Look for near-duplicate images
    pub use_perceptual: bool,
    pub classifier: ClassifierConfig,
    /// Absolute directories to skip
    pub exclude_dirs: Vec<PathBuf>,
    /// Directory names to skip, case-insensitively
    pub exclude_dir_names: Vec<String>,
    pub batch_size: usize,
    pub worker_shutdown_timeout_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            hash_algorithm: ContentHashAlgorithm::default(),
            hash_chunk_size: DEFAULT_CHUNK_SIZE,
            compute_hash_on_scan: false,
            perceptual_threshold: DEFAULT_PERCEPTUAL_THRESHOLD,
            fast_mode: true,
            use_perceptual: true,
            classifier: ClassifierConfig::default(),
            exclude_dirs: Vec::new(),
            exclude_dir_names: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            worker_shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl CleanupConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.perceptual_threshold > 64 {
            return Err(ConfigError::InvalidThreshold {
                value: self.perceptual_threshold,
            });
        }
        if self.hash_chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.classifier.enabled && self.classifier.command.is_none() {
            return Err(ConfigError::MissingClassifierCommand);
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Threshold actually used for perceptual matching
    pub fn effective_threshold(&self) -> u32 {
        if self.fast_mode {
            self.perceptual_threshold.min(FAST_MODE_THRESHOLD)
        } else {
            self.perceptual_threshold
        }
    }

    /// Scanner settings derived from this configuration
    pub fn scan_config(&self) -> ScanConfig {
        let dirs = self
            .exclude_dirs
            .iter()
            .map(|dir| std::path::absolute(dir).unwrap_or_else(|_| dir.clone()));
        let mut exclusion = ExclusionPolicy::default()
            .with_dirs(dirs)
            .with_names(self.exclude_dir_names.iter().cloned());
        if self.fast_mode {
            exclusion = exclusion.with_fast_mode_defaults();
        }

        ScanConfig {
            exclusion,
            compute_hash: self.compute_hash_on_scan,
            hash_algorithm: self.hash_algorithm,
            hash_chunk_size: self.hash_chunk_size,
            ..ScanConfig::default()
        }
    }

    pub fn content_hasher(&self) -> ContentHasher {
        ContentHasher::new(self.hash_algorithm, self.hash_chunk_size)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_shutdown_timeout_ms)
    }
}

/// Builder for pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: CleanupConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: CleanupConfig) -> Self {
        Self { config }
    }

    /// Directories to scan
    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.roots = roots;
        self
    }

    pub fn hash_algorithm(mut self, algorithm: ContentHashAlgorithm) -> Self {
        self.config.hash_algorithm = algorithm;
        self
    }

    pub fn hash_chunk_size(mut self, bytes: usize) -> Self {
        self.config.hash_chunk_size = bytes;
        self
    }

    pub fn compute_hash_on_scan(mut self, enabled: bool) -> Self {
        self.config.compute_hash_on_scan = enabled;
        self
    }

    /// Set the perceptual comparison threshold (lower = stricter)
    pub fn perceptual_threshold(mut self, threshold: u32) -> Self {
        self.config.perceptual_threshold = threshold;
        self
    }

    pub fn fast_mode(mut self, enabled: bool) -> Self {
        self.config.fast_mode = enabled;
        self
    }

    pub fn use_perceptual(mut self, enabled: bool) -> Self {
        self.config.use_perceptual = enabled;
        self
    }

    pub fn classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.config.classifier = classifier;
        self
    }

    pub fn exclude_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.config.exclude_dirs = dirs;
        self
    }

    pub fn exclude_dir_names(mut self, names: Vec<String>) -> Self {
        self.config.exclude_dir_names = names;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn worker_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.worker_shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<CleanupConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
