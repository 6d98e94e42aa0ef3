//! Leaf of the match index: files sharing attributes and both digests.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::bucket::Seed;
use super::priority::PriorityOrder;
use super::Duplicate;

/// Representative paths whose digests all collide.
///
/// Usually holds one path. It only grows when contents are compared and two
/// files with equal digests turn out to differ. Each entry is the current
/// highest-priority copy of its content.
#[derive(Debug)]
pub struct CollisionGroup {
    paths: Mutex<Vec<PathBuf>>,
}

impl Seed for CollisionGroup {
    fn seed(path: PathBuf) -> Self {
        Self {
            paths: Mutex::new(vec![path]),
        }
    }
}

impl CollisionGroup {
    /// Resolve an arriving path against the group.
    ///
    /// `same` decides whether two candidates hold identical content. The
    /// first representative it accepts is the match; whichever of the pair
    /// ranks lower in `priority` is returned for relocation and the other
    /// stays as representative. When nothing matches the path is appended.
    ///
    /// A path already present in the group is never reported against
    /// itself.
    pub fn resolve<F>(&self, path: &Path, mut same: F, priority: &PriorityOrder) -> Option<Duplicate>
    where
        F: FnMut(&Path, &Path) -> bool,
    {
        let mut paths = self.paths.lock();

        if paths.iter().any(|existing| existing.as_path() == path) {
            log::debug!("Already indexed: {}", path.display());
            return None;
        }

        for existing in paths.iter_mut() {
            if !same(existing.as_path(), path) {
                continue;
            }

            let duplicate = if priority.first_is_higher(existing.as_path(), path) {
                Duplicate {
                    retained: existing.clone(),
                    relocate: path.to_path_buf(),
                }
            } else {
                let displaced = std::mem::replace(existing, path.to_path_buf());
                Duplicate {
                    retained: path.to_path_buf(),
                    relocate: displaced,
                }
            };
            return Some(duplicate);
        }

        paths.push(path.to_path_buf());
        None
    }

    /// Snapshot of the current representatives.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    /// Number of representatives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Always false for a seeded group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}
