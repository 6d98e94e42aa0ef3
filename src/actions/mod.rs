//! File actions module.
//!
//! dedupe never deletes. The only action is relocation: each duplicate
//! chosen by the match index is moved beneath a trash root, mirroring its
//! original absolute path so it can be restored by hand.
//!
//! ```no_run
//! use dedupe::actions::relocate::destination_for;
//! use std::path::Path;
//!
//! let dest = destination_for(Path::new("/trash"), Path::new("/data/a.txt"));
//! assert_eq!(dest, Path::new("/trash/data/a.txt"));
//! ```

pub mod relocate;

// Re-export commonly used types
pub use relocate::{destination_for, RelocateError, Relocation, Relocator};
