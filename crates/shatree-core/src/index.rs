//! Shared tree context and the content-hash index.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::hasher::{ContentHash, ContentHasher};

/// Maps content hashes to the files that share them.
///
/// Filled as file hashes are computed. Backed by a concurrent map so that
/// recording from several readers at once stays sound.
#[derive(Debug, Default)]
pub struct HashIndex {
    by_hash: DashMap<ContentHash, BTreeSet<PathBuf>>,
}

impl HashIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            by_hash: DashMap::new(),
        }
    }

    /// Record `path` under `hash`. Returns `true` if the path was not yet listed.
    pub fn record(&self, hash: ContentHash, path: impl Into<PathBuf>) -> bool {
        self.by_hash.entry(hash).or_default().insert(path.into())
    }

    /// Files recorded under `hash`, in path order.
    pub fn files_with(&self, hash: &ContentHash) -> Vec<PathBuf> {
        self.by_hash
            .get(hash)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a file has been recorded under `hash`.
    pub fn contains(&self, hash: &ContentHash, path: &Path) -> bool {
        self.by_hash.get(hash).is_some_and(|set| set.contains(path))
    }

    /// Number of distinct hashes recorded.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Groups of two or more files with identical content.
    ///
    /// Sorted by group size descending, then by hash.
    pub fn duplicates(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<DuplicateGroup> = self
            .by_hash
            .iter()
            .filter(|entry| entry.value().len() > 1)
            .map(|entry| DuplicateGroup {
                hash: *entry.key(),
                paths: entry.value().iter().cloned().collect(),
            })
            .collect();
        groups.sort_by(|a, b| b.paths.len().cmp(&a.paths.len()).then(a.hash.cmp(&b.hash)));
        groups
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.by_hash.clear();
    }
}

/// Files sharing one content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,
    /// Relative paths of the files, sorted.
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Get the number of files in the group.
    pub fn count(&self) -> usize {
        self.paths.len()
    }
}

/// State shared by every node of one tree.
///
/// The root owns it behind an `Arc`; nodes keep a `Weak` to it, which is how
/// they reach the scan base, the hasher and the hash index.
#[derive(Debug)]
pub struct TreeContext {
    base: PathBuf,
    hasher: ContentHasher,
    index: HashIndex,
}

impl TreeContext {
    /// Create a context for a scan anchored at `base`.
    pub fn new(base: impl Into<PathBuf>, hasher: ContentHasher) -> Self {
        Self {
            base: base.into(),
            hasher,
            index: HashIndex::new(),
        }
    }

    /// Directory all relative node paths are anchored at.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Hasher configured for this tree.
    pub fn hasher(&self) -> ContentHasher {
        self.hasher
    }

    /// The hash-to-files index.
    pub fn index(&self) -> &HashIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_new_path() {
        let index = HashIndex::new();
        let hash = ContentHash::new([1; 20]);

        assert!(index.record(hash, "a.txt"));
        assert!(!index.record(hash, "a.txt"));
        assert!(index.contains(&hash, Path::new("a.txt")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicates_only_lists_shared_hashes() {
        let index = HashIndex::new();
        let shared = ContentHash::new([1; 20]);
        let unique = ContentHash::new([2; 20]);

        index.record(shared, "b/c.txt");
        index.record(shared, "a.txt");
        index.record(unique, "z.txt");

        let groups = index.duplicates();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash, shared);
        assert_eq!(
            groups[0].paths,
            vec![PathBuf::from("a.txt"), PathBuf::from("b/c.txt")]
        );
    }

    #[test]
    fn test_clear() {
        let index = HashIndex::new();
        index.record(ContentHash::new([3; 20]), "x");
        index.clear();
        assert!(index.is_empty());
    }
}
