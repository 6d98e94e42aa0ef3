//! Progressive match index.
//!
//! Files are refined in up to four stages, each more expensive than the
//! last, and only when an earlier stage found a candidate:
//!
//! 1. Attribute key (size, name, modification time as enabled)
//! 2. Partial digest of the first kilobyte
//! 3. Full content digest
//! 4. Byte-by-byte comparison against each representative
//!
//! Every stage is concurrent. The first file with a given key is parked
//! without I/O; the second one pays for both digests. The net effect is
//! that each content class keeps exactly one representative, the
//! highest-priority copy seen so far, and every other copy is handed back
//! from [`MatchIndex::classify`] for relocation.

use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde::Serialize;

use super::bucket::{load_or_store, Bucket, Seed};
use super::group::CollisionGroup;
use super::priority::PriorityOrder;
use super::Duplicate;
use crate::scanner::{FileDescriptor, HashError, Hasher};

/// Files sharing a partial digest, keyed by full digest.
pub type HeadBucket = Bucket<u64, CollisionGroup>;

/// Files sharing an attribute key, keyed by partial digest.
pub type AttributeBucket = Bucket<u32, HeadBucket>;

/// The enabled attributes of a file. Disabled attributes are `None` and
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    /// Base name
    pub name: Option<OsString>,
    /// Modification time
    pub modified: Option<SystemTime>,
    /// Size in bytes
    pub size: Option<u64>,
}

impl From<&FileDescriptor> for AttributeKey {
    fn from(file: &FileDescriptor) -> Self {
        Self {
            name: file.name.clone(),
            modified: file.modified,
            size: file.size,
        }
    }
}

/// Running counters for one index.
#[derive(Debug, Default)]
pub struct MatchStats {
    files: AtomicUsize,
    attribute_matches: AtomicUsize,
    head_matches: AtomicUsize,
    full_matches: AtomicUsize,
    duplicates: AtomicUsize,
    hash_errors: AtomicUsize,
}

/// Point-in-time copy of [`MatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    /// Files classified
    pub files: usize,
    /// Files whose attribute key was already present
    pub attribute_matches: usize,
    /// Files whose partial digest was already present
    pub head_matches: usize,
    /// Files whose full digest was already present
    pub full_matches: usize,
    /// Duplicates reported
    pub duplicates: usize,
    /// Digest or comparison failures
    pub hash_errors: usize,
}

impl MatchStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MatchSummary {
        MatchSummary {
            files: self.files.load(Ordering::Relaxed),
            attribute_matches: self.attribute_matches.load(Ordering::Relaxed),
            head_matches: self.head_matches.load(Ordering::Relaxed),
            full_matches: self.full_matches.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            hash_errors: self.hash_errors.load(Ordering::Relaxed),
        }
    }
}

/// Concurrent classifier that reports each file as unique or as a duplicate
/// of an indexed representative.
///
/// Safe to share across matcher threads. Digest failures never abort a run:
/// they are logged and the file is treated as unique.
#[derive(Debug)]
pub struct MatchIndex {
    attributes: DashMap<AttributeKey, Arc<AttributeBucket>>,
    hasher: Hasher,
    priority: PriorityOrder,
    stats: MatchStats,
}

impl MatchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(hasher: Hasher, priority: PriorityOrder) -> Self {
        Self {
            attributes: DashMap::new(),
            hasher,
            priority,
            stats: MatchStats::default(),
        }
    }

    /// Classify one file.
    ///
    /// Returns `None` when the file is the first of its content class (or
    /// could not be digested), otherwise the pair of retained and
    /// to-be-relocated paths. The relocated path is always the lower
    /// priority of the two, which may be a previously indexed file.
    pub fn classify(&self, file: &FileDescriptor) -> Option<Duplicate> {
        MatchStats::bump(&self.stats.files);
        let path = file.path.as_path();

        let (bucket, loaded) = load_or_store(&self.attributes, AttributeKey::from(file), || {
            AttributeBucket::seed(file.path.clone())
        });
        if !loaded {
            return None;
        }
        log::debug!("Attribute match: {}", path.display());
        MatchStats::bump(&self.stats.attribute_matches);

        let head = self.descend(&bucket, path, |p| self.hasher.partial_digest(p))?;
        log::debug!("Partial digest match: {}", path.display());
        MatchStats::bump(&self.stats.head_matches);

        let group = self.descend(&head, path, |p| self.hasher.full_digest(p))?;
        log::debug!("Full digest match: {}", path.display());
        MatchStats::bump(&self.stats.full_matches);

        let duplicate = group.resolve(path, |a, b| self.same_contents(a, b), &self.priority);
        if let Some(dup) = &duplicate {
            log::info!(
                "Duplicate: {} (kept {})",
                dup.relocate.display(),
                dup.retained.display()
            );
            MatchStats::bump(&self.stats.duplicates);
        }
        duplicate
    }

    /// Promote `bucket` if needed, then look up `path` by its own digest.
    fn descend<K, C, F>(&self, bucket: &Bucket<K, C>, path: &Path, digest: F) -> Option<Arc<C>>
    where
        K: Eq + std::hash::Hash + Copy,
        C: Seed,
        F: Fn(&Path) -> Result<K, HashError>,
    {
        if let Err(e) = bucket.ensure_promoted(&digest) {
            self.hash_failed(&e);
        }
        match digest(path) {
            Ok(key) => bucket.find_or_seed(key, path),
            Err(e) => {
                self.hash_failed(&e);
                None
            }
        }
    }

    fn same_contents(&self, a: &Path, b: &Path) -> bool {
        match self.hasher.bytes_equal(a, b) {
            Ok(same) => same,
            Err(e) => {
                self.hash_failed(&e);
                false
            }
        }
    }

    fn hash_failed(&self, error: &HashError) {
        log::warn!("{}", error);
        MatchStats::bump(&self.stats.hash_errors);
    }

    /// Counters gathered so far.
    #[must_use]
    pub fn stats(&self) -> MatchSummary {
        self.stats.snapshot()
    }

    /// The priority order used to pick representatives.
    #[must_use]
    pub fn priority(&self) -> &PriorityOrder {
        &self.priority
    }

    /// The bucket for an attribute key, if any file carried it.
    #[must_use]
    pub fn bucket(&self, key: &AttributeKey) -> Option<Arc<AttributeBucket>> {
        self.attributes.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of distinct attribute keys seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no file has been classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
