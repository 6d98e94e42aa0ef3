//! Directory walker with a traversal-wide visited set.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which turns a root path into a
//! lazy stream of [`FileDescriptor`]s. It uses [`walkdir`] with link following
//! disabled and resolves symbolic links itself, so that every emitted path
//! is canonical and can be recorded in a shared [`VisitedSet`].
//!
//! # Features
//!
//! - Regular files only; directories are traversed, never emitted
//! - Minimum size filter
//! - Symlinks either skipped or resolved and walked in-process
//! - Each real file or directory visited once, across roots and threads
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{VisitedSet, Walker, WalkerConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let visited = Arc::new(VisitedSet::new());
//! let walker = Walker::new(WalkerConfig::default(), visited);
//! let files: Vec<_> = walker.walk(Path::new("/data")).filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashSet;
use walkdir::{DirEntry, WalkDir};

use super::{FileDescriptor, ScanError, WalkerConfig};

/// Canonical paths already seen by any walker in this run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    paths: DashSet<PathBuf>,
}

impl VisitedSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`, returning `true` if it had not been seen before.
    pub fn insert(&self, path: &Path) -> bool {
        self.paths.insert(path.to_path_buf())
    }

    /// Whether `path` has been recorded.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Number of recorded paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Directory walker producing file descriptors.
#[derive(Debug)]
pub struct Walker {
    /// Walker configuration
    config: WalkerConfig,
    /// Paths already visited, shared between scanner threads
    visited: Arc<VisitedSet>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker.
    ///
    /// # Arguments
    ///
    /// * `config` - Filtering and symlink options
    /// * `visited` - Visited set shared by every walker of the run
    #[must_use]
    pub fn new(config: WalkerConfig, visited: Arc<VisitedSet>) -> Self {
        Self {
            config,
            visited,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, any walk in progress stops yielding.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The walker's configuration.
    #[must_use]
    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk `root`, yielding every qualifying regular file.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Walking the same root twice against one visited set
    /// yields nothing the second time.
    pub fn walk(&self, root: &Path) -> Walk<'_> {
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        log::debug!("Walking {}", root.display());
        Walk {
            walker: self,
            stack: vec![walk_dir(&root)],
            root,
        }
    }

    /// Decide what to do with one directory entry.
    fn visit(&self, entry: &DirEntry) -> Step {
        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            if !self.config.follow_symlinks {
                log::debug!("Ignoring symbolic link: {}", path.display());
                return Step::Skip;
            }
            return match fs::canonicalize(path) {
                Ok(target) => {
                    log::debug!(
                        "Following symbolic link: {} -> {}",
                        path.display(),
                        target.display()
                    );
                    Step::Follow(target)
                }
                Err(source) => Step::Yield(Err(ScanError::Symlink {
                    path: path.to_path_buf(),
                    source,
                })),
            };
        }

        if !self.visited.insert(path) {
            log::trace!("Already visited: {}", path.display());
            return if file_type.is_dir() {
                Step::SkipDir
            } else {
                Step::Skip
            };
        }

        if file_type.is_dir() {
            log::trace!("Visiting dir: {}", path.display());
            return Step::Skip;
        }
        if !file_type.is_file() {
            log::trace!("Skipping special file: {}", path.display());
            return Step::Skip;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => return Step::Yield(Err(scan_error(e, path))),
        };

        let size = metadata.len();
        if size < self.config.min_size {
            log::trace!("Ignoring file size {} bytes: {}", size, path.display());
            return Step::Skip;
        }

        let modified = if self.config.compare.mod_time {
            metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)
        } else {
            SystemTime::UNIX_EPOCH
        };

        log::trace!("Visiting file: {}", path.display());
        Step::Yield(Ok(FileDescriptor::from_metadata(
            path.to_path_buf(),
            size,
            modified,
            &self.config.compare,
        )))
    }
}

/// Lazy traversal of one root, including any followed symlink targets.
pub struct Walk<'a> {
    walker: &'a Walker,
    root: PathBuf,
    /// Innermost traversal last; followed symlinks push a new one.
    stack: Vec<walkdir::IntoIter>,
}

enum Step {
    Skip,
    SkipDir,
    Follow(PathBuf),
    Yield(Result<FileDescriptor, ScanError>),
}

impl Iterator for Walk<'_> {
    type Item = Result<FileDescriptor, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.walker.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                self.stack.clear();
                return None;
            }

            let step = match self.stack.last_mut()?.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(e)) => Step::Yield(Err(scan_error(e, &self.root))),
                Some(Ok(entry)) => self.walker.visit(&entry),
            };

            match step {
                Step::Skip => {}
                Step::SkipDir => {
                    if let Some(iter) = self.stack.last_mut() {
                        iter.skip_current_dir();
                    }
                }
                Step::Follow(target) => self.stack.push(walk_dir(&target)),
                Step::Yield(item) => return Some(item),
            }
        }
    }
}

fn walk_dir(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root).follow_links(false).into_iter()
}

/// Convert a walkdir error, falling back to `fallback` when it carries no path.
fn scan_error(err: walkdir::Error, fallback: &Path) -> ScanError {
    let path = err
        .path()
        .map_or_else(|| fallback.to_path_buf(), Path::to_path_buf);
    let message = err.to_string();
    match err.into_io_error() {
        Some(source) => ScanError::from_io(&path, source),
        None => ScanError::Io {
            path,
            source: io::Error::other(message),
        },
    }
}
