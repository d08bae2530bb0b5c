//! # Duplicates Module
//!
//! Groups records that are byte-identical or look the same.
//!
//! ## Strategies
//! - **Exact**: same size AND same content hash. Size buckets with a
//!   single member are never hashed.
//! - **Perceptual** (images only, opt-in): 64-bit fingerprints bucketed by
//!   their top 12 bits, then a greedy sliding-window pass per bucket.
//!
//! The perceptual pass is deliberately not transitive: a member joins a
//! group only if it is within the threshold of that group's seed, and only
//! the next [`WINDOW_SIZE`] fingerprints after the seed are examined.
//!
//! Each record ends up with a duplicate count: the size of its largest
//! matching group minus one, merged across both strategies by maximum.

mod exact;
mod perceptual;

pub use exact::find_exact_duplicates;
pub use perceptual::{
    find_perceptual_duplicates, group_fingerprints, perceptual_candidates, PREFIX_BITS,
    SUBSAMPLE_CAP, WINDOW_SIZE,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How a group's members were judged equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Identical bytes
    Exact,
    /// Fingerprints within the Hamming threshold of the seed
    Perceptual,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "Exact Match"),
            MatchKind::Perceptual => write!(f, "Near-Duplicate"),
        }
    }
}

/// A set of two or more records judged equal or near-identical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Unique identifier for this group
    pub id: Uuid,
    /// Strategy that produced the group
    pub kind: MatchKind,
    /// Member paths; the first one is the seed
    pub members: Vec<PathBuf>,
    /// Sum of member sizes, excluding the seed
    pub duplicate_size_bytes: u64,
}

impl DuplicateGroup {
    pub fn new(kind: MatchKind, members: Vec<PathBuf>, duplicate_size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            members,
            duplicate_size_bytes,
        }
    }

    /// The member the group was built around
    pub fn seed(&self) -> &Path {
        &self.members[0]
    }

    /// Number of duplicates (excluding the seed)
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }
}

/// Path → duplicate count lookup
#[derive(Debug, Clone, Default)]
pub struct DuplicateCounts {
    counts: HashMap<PathBuf, usize>,
}

impl DuplicateCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts from a single strategy's groups
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        let mut counts = Self::new();
        counts.merge_max(groups);
        counts
    }

    /// Fold in another strategy's groups, keeping the larger count per path
    pub fn merge_max(&mut self, groups: &[DuplicateGroup]) {
        for group in groups {
            let count = group.duplicate_count();
            for path in &group.members {
                let entry = self.counts.entry(path.clone()).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
    }

    /// Duplicate count for a path; zero when it belongs to no group
    pub fn get(&self, path: &Path) -> usize {
        self.counts.get(path).copied().unwrap_or(0)
    }

    /// Number of paths with at least one duplicate
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(kind: MatchKind, paths: &[&str]) -> DuplicateGroup {
        DuplicateGroup::new(kind, paths.iter().map(PathBuf::from).collect(), 0)
    }

    #[test]
    fn duplicate_count_excludes_seed() {
        let g = group(MatchKind::Exact, &["/a", "/b", "/c"]);
        assert_eq!(g.duplicate_count(), 2);
        assert_eq!(g.seed(), Path::new("/a"));
    }

    #[test]
    fn counts_take_maximum_across_strategies() {
        let exact = vec![group(MatchKind::Exact, &["/a", "/b"])];
        let perceptual = vec![group(MatchKind::Perceptual, &["/a", "/c", "/d", "/e"])];

        let mut counts = DuplicateCounts::from_groups(&exact);
        counts.merge_max(&perceptual);

        assert_eq!(counts.get(Path::new("/a")), 3);
        assert_eq!(counts.get(Path::new("/b")), 1);
        assert_eq!(counts.get(Path::new("/e")), 3);
        assert_eq!(counts.get(Path::new("/zzz")), 0);
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn smaller_later_group_does_not_lower_count() {
        let mut counts =
            DuplicateCounts::from_groups(&[group(MatchKind::Exact, &["/a", "/b", "/c"])]);
        counts.merge_max(&[group(MatchKind::Perceptual, &["/a", "/x"])]);

        assert_eq!(counts.get(Path::new("/a")), 2);
    }
}
