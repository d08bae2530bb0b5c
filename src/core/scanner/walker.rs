//! Lazy directory walking using walkdir.

use super::{ExclusionPolicy, FileRecord};
use crate::core::cancel::CancellationToken;
use crate::core::hasher::ContentHasher;
use crate::error::ScanError;
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

type EntryIter = Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>;

/// Single-pass iterator over the files below one root.
///
/// Yields `Ok(record)` per file and `Err` for directories that could not
/// be read. Files whose metadata cannot be read are skipped silently.
pub struct RecordWalker {
    entries: EntryIter,
    hasher: Option<ContentHasher>,
    cancel: Option<CancellationToken>,
}

impl RecordWalker {
    pub(super) fn new(
        root: PathBuf,
        exclusion: ExclusionPolicy,
        follow_symlinks: bool,
        hasher: Option<ContentHasher>,
    ) -> Self {
        let entries = WalkDir::new(&root)
            .follow_links(follow_symlinks)
            .into_iter()
            .filter_entry(move |entry| {
                // The root itself is never pruned.
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !exclusion.excludes(entry.path())
            });

        Self {
            entries: Box::new(entries),
            hasher,
            cancel: None,
        }
    }

    /// Stop yielding as soon as `token` is cancelled.
    ///
    /// The flag is checked before every directory entry, so cancellation
    /// is observed both between directories and between files.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    fn record_for(&self, entry: &DirEntry) -> Option<FileRecord> {
        let path = entry.path();
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping file without metadata");
                return None;
            }
        };
        if metadata.is_dir() {
            // Unfollowed symlink to a directory.
            return None;
        }

        let mut record = FileRecord::from_metadata(path, &metadata);
        if let Some(hasher) = &self.hasher {
            record.content_hash = hasher.try_hash_file(path);
        }
        Some(record)
    }
}

impl Iterator for RecordWalker {
    type Item = Result<FileRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_cancelled() {
                return None;
            }

            match self.entries.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    if let Some(record) = self.record_for(&entry) {
                        return Some(Ok(record));
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            reason: e.to_string(),
                        }
                    };
                    return Some(Err(error));
                }
            }
        }
    }
}
