//! Deterministic priority between two duplicate paths.
//!
//! Roots earlier in the operator's list win. For each root in order, if
//! exactly one of the two paths lies beneath it, that path is higher
//! priority. When no root separates them, the lexicographically smaller
//! path wins, so the order is total for distinct paths.
//!
//! "Beneath" is component-wise, not a string prefix: `/data2/x` is not
//! under `/data`.
//!
//! ```
//! use dedupe::duplicates::PriorityOrder;
//! use std::path::Path;
//!
//! let order = PriorityOrder::new(vec!["/priority-high".into(), "/priority-low".into()]);
//! assert!(order.first_is_higher(
//!     Path::new("/priority-high/a.txt"),
//!     Path::new("/priority-low/a.txt"),
//! ));
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Ordered list of priority roots, highest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityOrder {
    roots: Vec<PathBuf>,
}

impl PriorityOrder {
    /// Create an order from roots, highest priority first.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// The configured roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `first` should be kept over `second`.
    ///
    /// Returns `false` for identical paths.
    #[must_use]
    pub fn first_is_higher(&self, first: &Path, second: &Path) -> bool {
        self.compare(first, second) == Ordering::Less
    }

    /// Order two paths, `Less` meaning `first` has higher priority.
    #[must_use]
    pub fn compare(&self, first: &Path, second: &Path) -> Ordering {
        for root in &self.roots {
            match (first.starts_with(root), second.starts_with(root)) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        first.as_os_str().cmp(second.as_os_str())
    }
}
