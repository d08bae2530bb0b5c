//! # Scanner Module
//!
//! Inventories directory trees and emits one [`FileRecord`] per file.
//!
//! ## Behaviour
//! - Excluded directories are pruned before descent, so neither they nor
//!   their contents ever appear
//! - Files that vanish between listing and metadata lookup are skipped
//! - Kind is inferred from the extension, then a MIME guess, then `other`
//!
//! ## Example
//! ```rust,ignore
//! use cleanup_advisor::core::scanner::{ScanConfig, Scanner};
//!
//! let scanner = Scanner::new(ScanConfig::fast());
//! for record in scanner.walk("/home/me/Downloads")?.flatten() {
//!     println!("{} ({})", record.path.display(), record.kind);
//! }
//! ```

mod filter;
mod walker;

pub use filter::{ExclusionPolicy, FAST_MODE_EXCLUDED_NAMES};
pub use walker::RecordWalker;

use crate::core::hasher::{ContentHashAlgorithm, ContentHasher, DEFAULT_CHUNK_SIZE};
use crate::error::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One discovered file.
///
/// Paths are absolute and unique within a single scan pass. The two hash
/// fields start empty and are filled lazily by the duplicate detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Base name
    pub name: String,
    /// Lowercase extension without the leading dot (empty if none)
    pub ext: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time; `None` when the platform cannot report it
    pub mtime: Option<DateTime<Utc>>,
    /// Creation time, falling back to the modification time where the
    /// platform does not record one
    pub ctime: Option<DateTime<Utc>>,
    /// Coarse file kind
    pub kind: FileKind,
    #[serde(rename = "contentHash", default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(rename = "perceptualHash", default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<u64>,
}

impl FileRecord {
    /// Build a record from a path and its metadata.
    pub fn from_metadata(path: &Path, metadata: &std::fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let modified = metadata.modified().ok();
        let created = metadata.created().ok().or(modified);

        Self {
            path: path.to_path_buf(),
            name,
            ext: filter::lowercase_extension(path),
            size: metadata.len(),
            mtime: modified.map(DateTime::<Utc>::from),
            ctime: created.map(DateTime::<Utc>::from),
            kind: FileKind::from_path(path),
            content_hash: None,
            perceptual_hash: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == FileKind::Image
    }
}

/// Coarse classification of a file by type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
    Video,
    Audio,
    Archive,
    Other,
}

impl FileKind {
    /// Infer the kind of a file from its name.
    ///
    /// Fixed extension tables win; otherwise a MIME guess maps `image/*` to
    /// [`FileKind::Image`] and `text/*` to [`FileKind::Document`].
    pub fn from_path(path: &Path) -> Self {
        filter::kind_from_extension(&filter::lowercase_extension(path))
            .or_else(|| filter::kind_from_mime(path))
            .unwrap_or(FileKind::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Document => "document",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Archive => "archive",
            FileKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directories to prune
    pub exclusion: ExclusionPolicy,
    /// Compute the content hash inline while scanning
    pub compute_hash: bool,
    /// Algorithm used when `compute_hash` is set
    pub hash_algorithm: ContentHashAlgorithm,
    /// Read size used when hashing inline
    pub hash_chunk_size: usize,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclusion: ExclusionPolicy::default(),
            compute_hash: false,
            hash_algorithm: ContentHashAlgorithm::default(),
            hash_chunk_size: DEFAULT_CHUNK_SIZE,
            follow_symlinks: false,
        }
    }
}

impl ScanConfig {
    /// Default configuration with the fast-mode directory names excluded
    pub fn fast() -> Self {
        Self {
            exclusion: ExclusionPolicy::default().with_fast_mode_defaults(),
            ..Self::default()
        }
    }
}

/// Result of an eager scan
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Every record discovered, in walk order
    pub records: Vec<FileRecord>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Walks directory trees and produces [`FileRecord`]s
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Start a lazy, single-pass walk of one root.
    ///
    /// The root is made absolute first so every emitted path is absolute.
    pub fn walk(&self, root: impl AsRef<Path>) -> Result<RecordWalker, ScanError> {
        let root = root.as_ref();
        let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        if !absolute.exists() {
            return Err(ScanError::DirectoryNotFound { path: absolute });
        }
        if !absolute.is_dir() {
            return Err(ScanError::NotADirectory { path: absolute });
        }

        let hasher = self.config.compute_hash.then(|| {
            ContentHasher::new(self.config.hash_algorithm, self.config.hash_chunk_size)
        });

        Ok(RecordWalker::new(
            absolute,
            self.config.exclusion.clone(),
            self.config.follow_symlinks,
            hasher,
        ))
    }

    /// Walk every root to completion and collect the records.
    pub fn scan(&self, roots: &[PathBuf]) -> ScanResult {
        let mut result = ScanResult::default();

        for root in roots {
            match self.walk(root) {
                Ok(walker) => {
                    for item in walker {
                        match item {
                            Ok(record) => result.records.push(record),
                            Err(error) => result.errors.push(error),
                        }
                    }
                }
                Err(error) => result.errors.push(error),
            }
        }

        result
    }
}
