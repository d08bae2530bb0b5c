//! Perceptual Hash (pHash) implementation.
//!
//! The image is shrunk, converted to grayscale and passed through a
//! Discrete Cosine Transform; each of the 64 low-frequency coefficients
//! becomes one bit depending on whether it is above the mean. This makes
//! the fingerprint robust to:
//! - Scaling
//! - Brightness/contrast changes
//! - Compression artifacts
//!
//! The transform itself comes from the image_hasher crate.

use super::decode::decode_image;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use std::path::Path;
use tracing::debug;

/// Number of differing bits between two fingerprints
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Computes 64-bit DCT mean hashes
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        Self { hasher }
    }

    /// Fingerprint an already-decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Option<u64> {
        let hash = self.hasher.hash_image(image);
        let bytes: [u8; 8] = hash.as_bytes().try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    /// Decode and fingerprint a file. Decode failures yield `None`.
    pub fn hash_file(&self, path: &Path) -> Option<u64> {
        match decode_image(path) {
            Ok(image) => self.hash_image(&image),
            Err(e) => {
                debug!(error = %e, "no perceptual hash");
                None
            }
        }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn create_pattern_image(size: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(size, size, |x, y| {
            let base = if (x / 16 + y / 16) % 2 == 0 { 40u8 } else { 200u8 };
            Luma([base])
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn hamming_distance_counts_bits() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0b1011, 0b0001), 2);
        assert_eq!(hamming_distance(u64::MAX, 0), 64);
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let hasher = PerceptualHasher::new();
        let image = create_pattern_image(128);

        let a = hasher.hash_image(&image).unwrap();
        let b = hasher.hash_image(&image).unwrap();

        assert_eq!(hamming_distance(a, b), 0);
    }

    #[test]
    fn resized_image_stays_close() {
        let hasher = PerceptualHasher::new();
        let a = hasher.hash_image(&create_pattern_image(256)).unwrap();
        let b = hasher.hash_image(&create_pattern_image(256).resize_exact(
            128,
            128,
            image::imageops::FilterType::Triangle,
        ));

        assert!(hamming_distance(a, b.unwrap()) <= 8);
    }

    #[test]
    fn undecodable_file_has_no_hash() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"garbage").unwrap();

        assert!(PerceptualHasher::new().hash_file(&path).is_none());
    }
}
