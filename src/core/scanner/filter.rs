//! Kind inference and directory exclusion for the scanner.

use super::FileKind;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "heic"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "txt", "md", "rtf", "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "m4a", "ogg"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];

/// Directory names pruned in fast mode: version control, build output,
/// caches and OS system folders.
pub const FAST_MODE_EXCLUDED_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "__pycache__",
    "dist",
    "build",
    "AppData",
    "Windows",
    "Program Files",
    "Program Files (x86)",
];

pub(super) fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub(super) fn kind_from_extension(ext: &str) -> Option<FileKind> {
    let tables: [(&[&str], FileKind); 5] = [
        (IMAGE_EXTENSIONS, FileKind::Image),
        (DOCUMENT_EXTENSIONS, FileKind::Document),
        (VIDEO_EXTENSIONS, FileKind::Video),
        (AUDIO_EXTENSIONS, FileKind::Audio),
        (ARCHIVE_EXTENSIONS, FileKind::Archive),
    ];

    tables
        .iter()
        .find(|(extensions, _)| extensions.contains(&ext))
        .map(|(_, kind)| *kind)
}

pub(super) fn kind_from_mime(path: &Path) -> Option<FileKind> {
    let mime = mime_guess::from_path(path).first()?;
    match mime.type_().as_str() {
        "image" => Some(FileKind::Image),
        "text" => Some(FileKind::Document),
        _ => None,
    }
}

/// Which directories the scanner never descends into.
///
/// Paths are matched exactly; names are matched case-insensitively
/// against the directory's base name.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    dirs: HashSet<PathBuf>,
    names: HashSet<String>,
}

impl ExclusionPolicy {
    pub fn new<P, N>(dirs: P, names: N) -> Self
    where
        P: IntoIterator<Item = PathBuf>,
        N: IntoIterator<Item = String>,
    {
        Self::default().with_dirs(dirs).with_names(names)
    }

    /// Add absolute directory paths to skip
    pub fn with_dirs<P: IntoIterator<Item = PathBuf>>(mut self, dirs: P) -> Self {
        self.dirs.extend(dirs);
        self
    }

    /// Add directory names to skip
    pub fn with_names<N: IntoIterator<Item = String>>(mut self, names: N) -> Self {
        self.names
            .extend(names.into_iter().map(|name| name.to_lowercase()));
        self
    }

    /// Add the fast-mode name list
    pub fn with_fast_mode_defaults(self) -> Self {
        self.with_names(FAST_MODE_EXCLUDED_NAMES.iter().map(|n| n.to_string()))
    }

    /// Whether the directory at `path` should be pruned
    pub fn excludes(&self, path: &Path) -> bool {
        if self.dirs.contains(path) {
            return true;
        }

        path.file_name()
            .map(|name| self.names.contains(&name.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.names.is_empty()
    }
}
