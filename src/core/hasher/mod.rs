//! # Hasher Module
//!
//! Computes the two fingerprints the duplicate detector works with.
//!
//! ## Content hash
//! Streamed over fixed-size chunks through a general-purpose digest. Only
//! equality matters, so the fast non-cryptographic xxh3 is the default;
//! blake3 and md5 are available for interoperability.
//!
//! ## Perceptual hash
//! A 64-bit DCT mean hash (pHash): visually similar images land a small
//! Hamming distance apart.
//!
//! ## Example
//! ```rust,ignore
//! use cleanup_advisor::core::hasher::{ContentHasher, PerceptualHasher};
//!
//! let digest = ContentHasher::default().try_hash_file(&path);
//! let fingerprint = PerceptualHasher::new().hash_file(&path);
//! ```

mod content;
pub mod decode;
mod perceptual;

pub use content::{ContentHashAlgorithm, ContentHasher, DEFAULT_CHUNK_SIZE};
pub use perceptual::{hamming_distance, PerceptualHasher};
