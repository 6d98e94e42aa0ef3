//! Concurrent buckets with a single-path-then-promote lifecycle.
//!
//! A [`Bucket`] starts out holding one pending path and no digest. The
//! second arrival promotes it: the pending path is digested once, under the
//! bucket's lock, and becomes the first child of a digest-keyed map. Later
//! arrivals only digest themselves. A bucket whose attributes stay unique
//! therefore never costs any hashing.
//!
//! Children are created through [`Seed`], so the same type serves the
//! attribute stage (children keyed by partial digest) and the partial-digest
//! stage (children keyed by full digest).

use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::scanner::HashError;

/// A node that can be created from the first path that reaches it.
pub trait Seed {
    /// Build the node around its first path.
    fn seed(path: PathBuf) -> Self;
}

/// Insert-if-absent on a concurrent map of shared nodes.
///
/// Returns the node now stored under `key` and whether it already existed.
/// `make` runs only when the key was vacant.
pub fn load_or_store<K, V>(map: &DashMap<K, Arc<V>>, key: K, make: impl FnOnce() -> V) -> (Arc<V>, bool)
where
    K: Eq + Hash,
{
    match map.entry(key) {
        Entry::Occupied(entry) => (Arc::clone(entry.get()), true),
        Entry::Vacant(entry) => {
            let node = Arc::new(make());
            entry.insert(Arc::clone(&node));
            (node, false)
        }
    }
}

/// One refinement stage of the match index.
#[derive(Debug)]
pub struct Bucket<K, C>
where
    K: Eq + Hash,
{
    /// Set once the pending path has been digested (or dropped).
    promoted: AtomicBool,
    pending: Mutex<Option<PathBuf>>,
    children: DashMap<K, Arc<C>>,
}

impl<K, C> Seed for Bucket<K, C>
where
    K: Eq + Hash,
{
    fn seed(path: PathBuf) -> Self {
        Self {
            promoted: AtomicBool::new(false),
            pending: Mutex::new(Some(path)),
            children: DashMap::new(),
        }
    }
}

impl<K, C> Bucket<K, C>
where
    K: Eq + Hash + Copy,
    C: Seed,
{
    /// Promote the pending path into the child map, at most once.
    ///
    /// Cheap after the first call. Racing callers block on the bucket lock
    /// and find the work already done. If digesting the pending path fails
    /// the path is dropped and the bucket is promoted empty; the error is
    /// returned so the caller can report it.
    ///
    /// # Errors
    ///
    /// Returns the [`HashError`] raised while digesting the pending path.
    pub fn ensure_promoted<F>(&self, digest: F) -> Result<(), HashError>
    where
        F: FnOnce(&Path) -> Result<K, HashError>,
    {
        if self.promoted.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut pending = self.pending.lock();
        let Some(path) = pending.take() else {
            return Ok(());
        };

        let result = match digest(&path) {
            Ok(key) => {
                self.children.insert(key, Arc::new(C::seed(path)));
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.promoted.store(true, Ordering::Release);
        result
    }

    /// Find the child under `key`, or seed a new one with `path`.
    ///
    /// Returns the existing child, or `None` when `path` became the first
    /// entry under `key`.
    pub fn find_or_seed(&self, key: K, path: &Path) -> Option<Arc<C>> {
        let (child, loaded) = load_or_store(&self.children, key, || C::seed(path.to_path_buf()));
        loaded.then_some(child)
    }

    /// Whether the pending path has been promoted.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.promoted.load(Ordering::Acquire)
    }

    /// The pending path, if the bucket has not been promoted.
    #[must_use]
    pub fn pending_path(&self) -> Option<PathBuf> {
        self.pending.lock().clone()
    }

    /// The child stored under `key`.
    #[must_use]
    pub fn child(&self, key: &K) -> Option<Arc<C>> {
        self.children.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of distinct digests seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no digest has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
