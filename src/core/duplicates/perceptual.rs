//! Near-duplicate image grouping over 64-bit perceptual fingerprints.

use super::{DuplicateGroup, MatchKind};
use crate::core::hasher::{hamming_distance, PerceptualHasher};
use crate::core::scanner::FileRecord;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Fingerprints are bucketed by this many leading bits (4096 buckets)
pub const PREFIX_BITS: u32 = 12;

/// How many following fingerprints each seed is compared against
pub const WINDOW_SIZE: usize = 50;

/// Fast-mode cap on the number of images compared
pub const SUBSAMPLE_CAP: usize = 3000;

/// Indices of the records that take part in the perceptual pass.
///
/// All images normally. In fast mode with more than [`SUBSAMPLE_CAP`]
/// images, every other image is kept, capped at [`SUBSAMPLE_CAP`].
pub fn perceptual_candidates(records: &[FileRecord], fast_mode: bool) -> Vec<usize> {
    let images: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_image())
        .map(|(index, _)| index)
        .collect();

    if fast_mode && images.len() > SUBSAMPLE_CAP {
        images.into_iter().step_by(2).take(SUBSAMPLE_CAP).collect()
    } else {
        images
    }
}

/// Greedy windowed grouping of `(id, fingerprint)` pairs.
///
/// Within each prefix bucket, members are sorted by fingerprint. Each
/// unvisited member seeds a group and claims any unvisited member among the
/// next [`WINDOW_SIZE`] whose distance to the seed is within `threshold`.
/// Returned groups hold ids, seed first, and always have two or more
/// members.
pub fn group_fingerprints(items: &[(usize, u64)], threshold: u32) -> Vec<Vec<usize>> {
    let mut buckets: BTreeMap<u64, Vec<(u64, usize)>> = BTreeMap::new();
    for &(id, fingerprint) in items {
        buckets
            .entry(fingerprint >> (64 - PREFIX_BITS))
            .or_default()
            .push((fingerprint, id));
    }

    let mut groups = Vec::new();
    for mut bucket in buckets.into_values() {
        bucket.sort_unstable();
        let n = bucket.len();
        let mut visited = vec![false; n];

        for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let (seed_fingerprint, seed_id) = bucket[i];
            let mut group = vec![seed_id];

            for j in (i + 1)..n.min(i + 1 + WINDOW_SIZE) {
                if visited[j] {
                    continue;
                }
                let (fingerprint, id) = bucket[j];
                if hamming_distance(seed_fingerprint, fingerprint) <= threshold {
                    group.push(id);
                    visited[j] = true;
                }
            }

            if group.len() > 1 {
                groups.push(group);
            }
        }
    }

    groups
}

/// Find near-duplicate images among `candidates` (indices into `records`).
///
/// Missing fingerprints are computed in parallel and written back. Records
/// that cannot be decoded, or whose fingerprint is zero, take no part.
pub fn find_perceptual_duplicates(
    records: &mut [FileRecord],
    candidates: &[usize],
    hasher: &PerceptualHasher,
    threshold: u32,
) -> Vec<DuplicateGroup> {
    let view: &[FileRecord] = records;
    let computed: Vec<(usize, Option<u64>)> = candidates
        .par_iter()
        .filter(|&&i| view[i].is_image() && view[i].perceptual_hash.is_none())
        .map(|&i| (i, hasher.hash_file(&view[i].path).filter(|&fp| fp != 0)))
        .collect();

    for (index, fingerprint) in computed {
        records[index].perceptual_hash = fingerprint;
    }

    let items: Vec<(usize, u64)> = candidates
        .iter()
        .filter(|&&i| records[i].is_image())
        .filter_map(|&i| records[i].perceptual_hash.filter(|&fp| fp != 0).map(|fp| (i, fp)))
        .collect();

    debug!(
        candidates = candidates.len(),
        fingerprinted = items.len(),
        threshold,
        "perceptual duplicate pass"
    );

    group_fingerprints(&items, threshold)
        .into_iter()
        .map(|members| {
            let wasted = members[1..].iter().map(|&i| records[i].size).sum();
            let paths = members.iter().map(|&i| records[i].path.clone()).collect();
            DuplicateGroup::new(MatchKind::Perceptual, paths, wasted)
        })
        .collect()
}
