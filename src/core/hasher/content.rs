//! Streaming content hashing for exact-duplicate detection.

use crate::error::{ConfigError, HashError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use xxhash_rust::xxh3::Xxh3;

/// Default read size: 1 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Available content digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentHashAlgorithm {
    /// xxHash3 64-bit - fastest, not cryptographic
    #[default]
    Xxh3,
    /// BLAKE3 - fast and cryptographic
    Blake3,
    /// MD5 - legacy, widely interoperable
    Md5,
}

impl std::fmt::Display for ContentHashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentHashAlgorithm::Xxh3 => write!(f, "xxh3"),
            ContentHashAlgorithm::Blake3 => write!(f, "blake3"),
            ContentHashAlgorithm::Md5 => write!(f, "md5"),
        }
    }
}

impl FromStr for ContentHashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xxh3" | "xxhash" => Ok(ContentHashAlgorithm::Xxh3),
            "blake3" => Ok(ContentHashAlgorithm::Blake3),
            "md5" => Ok(ContentHashAlgorithm::Md5),
            _ => Err(ConfigError::UnknownHashAlgorithm(s.to_string())),
        }
    }
}

enum DigestState {
    Xxh3(Box<Xxh3>),
    Blake3(Box<blake3::Hasher>),
    Md5(md5::Context),
}

impl DigestState {
    fn new(algorithm: ContentHashAlgorithm) -> Self {
        match algorithm {
            ContentHashAlgorithm::Xxh3 => DigestState::Xxh3(Box::new(Xxh3::new())),
            ContentHashAlgorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
            ContentHashAlgorithm::Md5 => DigestState::Md5(md5::Context::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            DigestState::Xxh3(h) => h.update(bytes),
            DigestState::Blake3(h) => {
                h.update(bytes);
            }
            DigestState::Md5(h) => h.consume(bytes),
        }
    }

    fn finish_hex(self) -> String {
        match self {
            DigestState::Xxh3(h) => format!("{:016x}", h.digest()),
            DigestState::Blake3(h) => h.finalize().to_hex().to_string(),
            DigestState::Md5(h) => format!("{:x}", h.compute()),
        }
    }
}

/// Hashes file contents in fixed-size chunks
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    algorithm: ContentHashAlgorithm,
    chunk_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(ContentHashAlgorithm::default(), DEFAULT_CHUNK_SIZE)
    }
}

impl ContentHasher {
    /// A zero `chunk_size` is bumped to one byte.
    pub fn new(algorithm: ContentHashAlgorithm, chunk_size: usize) -> Self {
        Self {
            algorithm,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn algorithm(&self) -> ContentHashAlgorithm {
        self.algorithm
    }

    /// Hash a file, returning the hex digest.
    pub fn hash_file(&self, path: &Path) -> Result<String, HashError> {
        let io_error = |source| HashError::IoError {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_error)?;
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(e)),
            }
        }

        Ok(state.finish_hex())
    }

    /// Hash a file, mapping any read failure to `None`.
    pub fn try_hash_file(&self, path: &Path) -> Option<String> {
        match self.hash_file(path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                debug!(error = %e, "content hash unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ALL: [ContentHashAlgorithm; 3] = [
        ContentHashAlgorithm::Xxh3,
        ContentHashAlgorithm::Blake3,
        ContentHashAlgorithm::Md5,
    ];

    #[test]
    fn hashing_same_file_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![7u8; 10_000]).unwrap();

        for algorithm in ALL {
            let hasher = ContentHasher::new(algorithm, 4096);
            assert_eq!(hasher.hash_file(&path).unwrap(), hasher.hash_file(&path).unwrap());
        }
    }

    #[test]
    fn chunk_size_does_not_change_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        for algorithm in ALL {
            let small = ContentHasher::new(algorithm, 7).hash_file(&path).unwrap();
            let large = ContentHasher::new(algorithm, DEFAULT_CHUNK_SIZE).hash_file(&path).unwrap();
            assert_eq!(small, large, "{algorithm} digest depends on chunking");
        }
    }

    #[test]
    fn md5_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let hasher = ContentHasher::new(ContentHashAlgorithm::Md5, 2);
        assert_eq!(hasher.hash_file(&path).unwrap(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn different_content_produces_different_digest() {
        let dir = TempDir::new().unwrap();
        let left = dir.path().join("left.txt");
        let right = dir.path().join("right.txt");
        std::fs::write(&left, b"left").unwrap();
        std::fs::write(&right, b"right").unwrap();

        let hasher = ContentHasher::default();
        assert_ne!(hasher.hash_file(&left).unwrap(), hasher.hash_file(&right).unwrap());
    }

    #[test]
    fn missing_file_yields_none() {
        let hasher = ContentHasher::default();
        assert!(hasher.try_hash_file(Path::new("/nonexistent/file.bin")).is_none());
    }

    #[test]
    fn algorithm_parses_from_str() {
        assert_eq!("XXH3".parse::<ContentHashAlgorithm>().unwrap(), ContentHashAlgorithm::Xxh3);
        assert_eq!("md5".parse::<ContentHashAlgorithm>().unwrap(), ContentHashAlgorithm::Md5);
        assert!("sha1".parse::<ContentHashAlgorithm>().is_err());
    }
}
