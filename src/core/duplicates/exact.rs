//! Exact-duplicate detection: size pre-partition, then content hash.

use super::{DuplicateGroup, MatchKind};
use crate::core::hasher::ContentHasher;
use crate::core::scanner::FileRecord;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Group records with identical size and identical content hash.
///
/// Files of a unique size (and empty files) are never hashed. Hashes
/// already present on a record are reused; newly computed ones are written
/// back. Records whose hash cannot be computed stay unmatched.
pub fn find_exact_duplicates(
    records: &mut [FileRecord],
    hasher: &ContentHasher,
) -> Vec<DuplicateGroup> {
    let mut by_size: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        if record.size > 0 {
            by_size.entry(record.size).or_default().push(index);
        }
    }
    by_size.retain(|_, bucket| bucket.len() >= 2);

    let view: &[FileRecord] = records;
    let computed: Vec<(usize, Option<String>)> = by_size
        .values()
        .flatten()
        .copied()
        .filter(|&i| view[i].content_hash.is_none())
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|i| (i, hasher.try_hash_file(&view[i].path)))
        .collect();

    debug!(
        hashed = computed.len(),
        buckets = by_size.len(),
        "exact duplicate pass"
    );

    for (index, digest) in computed {
        records[index].content_hash = digest;
    }

    let mut groups: Vec<(usize, DuplicateGroup)> = Vec::new();
    for (size, bucket) in &by_size {
        let mut by_hash: HashMap<&str, Vec<usize>> = HashMap::new();
        for &index in bucket {
            if let Some(digest) = records[index].content_hash.as_deref() {
                by_hash.entry(digest).or_default().push(index);
            }
        }

        for members in by_hash.into_values().filter(|m| m.len() >= 2) {
            let first = members[0];
            let paths = members.iter().map(|&i| records[i].path.clone()).collect();
            let wasted = size * (members.len() as u64 - 1);
            groups.push((first, DuplicateGroup::new(MatchKind::Exact, paths, wasted)));
        }
    }

    groups.sort_by_key(|(first, _)| *first);
    groups.into_iter().map(|(_, group)| group).collect()
}
