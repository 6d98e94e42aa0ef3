//! Relocation of duplicate files beneath a trash root.
//!
//! # Overview
//!
//! A duplicate is moved to `trash` joined with its own absolute path, so
//! `/data/photos/a.jpg` relocated into `/trash` lands at
//! `/trash/data/photos/a.jpg`. Intermediate directories are created as
//! needed. Nothing is ever deleted and an existing destination is never
//! overwritten.
//!
//! Without a trash root the relocator runs dry: it reports what it would
//! move and leaves the file in place.
//!
//! # Example
//!
//! ```no_run
//! use dedupe::actions::Relocator;
//! use std::path::{Path, PathBuf};
//!
//! let relocator = Relocator::new(Some(PathBuf::from("/trash")));
//! match relocator.relocate(Path::new("/data/copy.txt")) {
//!     Ok(moved) => println!("{:?}", moved.destination),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Error type for relocation.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The destination's parent directories could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Something already exists at the destination.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The rename itself failed (source gone, cross-device, permissions).
    #[error("cannot move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RelocateError {
    /// The path the failure is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::CreateDir { path, .. } | Self::DestinationExists(path) => path,
            Self::Rename { from, .. } => from,
        }
    }
}

/// Outcome of one relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    /// The duplicate that was (or would be) moved
    pub source: PathBuf,
    /// Where it went; `None` on a dry run
    pub destination: Option<PathBuf>,
}

/// Moves duplicates into a trash root, or pretends to.
#[derive(Debug, Clone, Default)]
pub struct Relocator {
    trash: Option<PathBuf>,
}

impl Relocator {
    /// Create a relocator. `None` means dry run.
    #[must_use]
    pub fn new(trash: Option<PathBuf>) -> Self {
        Self { trash }
    }

    /// The trash root, if any.
    #[must_use]
    pub fn trash(&self) -> Option<&Path> {
        self.trash.as_deref()
    }

    /// Whether moves are only reported.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.trash.is_none()
    }

    /// Move `path` beneath the trash root.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError`] if the destination exists, its parent cannot
    /// be created, or the rename fails. The source is left untouched in
    /// every error case.
    pub fn relocate(&self, path: &Path) -> Result<Relocation, RelocateError> {
        let Some(trash) = &self.trash else {
            log::debug!("Dry run, not moving {}", path.display());
            return Ok(Relocation {
                source: path.to_path_buf(),
                destination: None,
            });
        };

        let destination = destination_for(trash, path);
        if fs::symlink_metadata(&destination).is_ok() {
            return Err(RelocateError::DestinationExists(destination));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| RelocateError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::rename(path, &destination).map_err(|source| RelocateError::Rename {
            from: path.to_path_buf(),
            to: destination.clone(),
            source,
        })?;

        log::info!("Moved {} -> {}", path.display(), destination.display());
        Ok(Relocation {
            source: path.to_path_buf(),
            destination: Some(destination),
        })
    }
}

/// Mirror an absolute `path` beneath `trash`.
///
/// Root and prefix markers are stripped (a Windows drive `C:` becomes a
/// plain `C` directory); `.` and `..` components are dropped.
#[must_use]
pub fn destination_for(trash: &Path, path: &Path) -> PathBuf {
    let mut destination = trash.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(part) => destination.push(part),
            Component::Prefix(prefix) => {
                let drive: String = prefix
                    .as_os_str()
                    .to_string_lossy()
                    .chars()
                    .filter(|c| !matches!(c, ':' | '\\' | '/' | '?'))
                    .collect();
                if !drive.is_empty() {
                    destination.push(drive);
                }
            }
            Component::RootDir | Component::CurDir | Component::ParentDir => {}
        }
    }
    destination
}
