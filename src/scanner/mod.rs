//! Scanner module for directory traversal and file digesting.
//!
//! This module provides functionality for:
//! - Directory walking with a traversal-wide visited set
//! - Partial and full content digests (xxHash)
//! - Byte-exact comparison of two files
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Streaming digests and lockstep comparison
//!
//! # Example
//!
//! ```no_run
//! use dedupe::scanner::{VisitedSet, Walker, WalkerConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = WalkerConfig {
//!     min_size: 1024, // Skip files under 1KiB
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(config, Arc::new(VisitedSet::new()));
//! for entry in walker.walk(Path::new("/data")) {
//!     match entry {
//!         Ok(file) => println!("{}", file.path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{Hasher, BLOCK_SIZE, PARTIAL_SIZE};
pub use walker::{VisitedSet, Walk, Walker};

/// Which file properties must agree before two files count as duplicates.
///
/// Disabled attributes are never read from the filesystem and compare
/// equal, so they drop out of the match key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareModes {
    /// Compare last-modified timestamps.
    pub mod_time: bool,
    /// Compare base names.
    pub name: bool,
    /// Compare sizes in bytes.
    pub size: bool,
    /// Compare partial and full content digests.
    pub hash: bool,
    /// Compare whole contents byte by byte after digests match.
    pub contents: bool,
}

impl Default for CompareModes {
    fn default() -> Self {
        Self {
            mod_time: false,
            name: false,
            size: true,
            hash: true,
            contents: false,
        }
    }
}

impl CompareModes {
    /// True when at least one comparison is enabled.
    #[must_use]
    pub fn any(&self) -> bool {
        self.mod_time || self.name || self.size || self.hash || self.contents
    }
}

/// One observed regular file.
///
/// Only the attributes enabled in [`CompareModes`] are populated; the
/// others stay `None`. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Absolute path to the file (identity)
    pub path: PathBuf,
    /// Base name, if names are compared
    pub name: Option<OsString>,
    /// Size in bytes, if sizes are compared
    pub size: Option<u64>,
    /// Last modification time, if timestamps are compared
    pub modified: Option<SystemTime>,
}

impl FileDescriptor {
    /// Create a descriptor carrying only a path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            name: None,
            size: None,
            modified: None,
        }
    }

    /// Create a descriptor from stat results, keeping only what `modes` asks for.
    #[must_use]
    pub fn from_metadata(path: PathBuf, size: u64, modified: SystemTime, modes: &CompareModes) -> Self {
        let name = if modes.name {
            path.file_name().map(ToOwned::to_owned)
        } else {
            None
        };
        Self {
            name,
            size: modes.size.then_some(size),
            modified: modes.mod_time.then_some(modified),
            path,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Resolve symbolic links and walk their targets.
    /// When false, symlinks are skipped entirely.
    pub follow_symlinks: bool,

    /// Minimum file size to include (in bytes).
    /// Files smaller than this are skipped.
    pub min_size: u64,

    /// Which attributes to record on each descriptor.
    pub compare: CompareModes,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            min_size: 1,
            compare: CompareModes::default(),
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A symbolic link could not be resolved.
    #[error("Failed to resolve symbolic link {path}: {source}")]
    Symlink {
        /// The link that failed to resolve
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Errors that can occur while digesting or comparing files.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised for `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
