//! JSON-lines records for machine consumption.
//!
//! Each line is one self-contained object tagged by `event`:
//!
//! ```json
//! {"event":"duplicate","retained":"/high/a.txt","relocated":"/low/a.txt"}
//! {"event":"move","source":"/low/a.txt","destination":"/trash/low/a.txt"}
//! {"event":"summary","files_discovered":2,"duplicates":1,"relocated":1,...}
//! ```
//!
//! `destination` is `null` on a dry run.

use std::path::Path;

use serde::Serialize;

use crate::actions::Relocation;
use crate::duplicates::Duplicate;
use crate::pipeline::PipelineSummary;

/// End-of-run counters.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Roots seeded into discovery
    pub roots: usize,
    /// Files handed to the matchers
    pub files_discovered: usize,
    /// Traversal errors (logged and skipped)
    pub scan_errors: usize,
    /// Files classified by the match index
    pub files_classified: usize,
    /// Duplicate pairs found
    pub duplicates: usize,
    /// Files moved (or reported, on a dry run)
    pub relocated: usize,
    /// Moves that failed and left the source in place
    pub relocation_failures: usize,
    /// Digest and comparison failures
    pub hash_errors: usize,
    /// Whether Ctrl+C cut the run short
    pub interrupted: bool,
    /// Wall-clock run time in milliseconds
    pub duration_ms: u64,
}

impl From<&PipelineSummary> for JsonSummary {
    fn from(summary: &PipelineSummary) -> Self {
        Self {
            roots: summary.roots,
            files_discovered: summary.files_discovered,
            scan_errors: summary.scan_errors,
            files_classified: summary.matches.files,
            duplicates: summary.matches.duplicates,
            relocated: summary.relocated,
            relocation_failures: summary.relocation_failures,
            hash_errors: summary.matches.hash_errors,
            interrupted: summary.interrupted,
            duration_ms: summary.elapsed.as_millis() as u64,
        }
    }
}

/// One line of JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JsonEvent {
    /// A duplicate pair was found
    Duplicate {
        /// The copy left in place
        retained: String,
        /// The copy scheduled for relocation
        relocated: String,
    },
    /// A duplicate was moved
    Move {
        /// Original location
        source: String,
        /// New location, `None` on a dry run
        destination: Option<String>,
    },
    /// Final counters
    Summary(JsonSummary),
}

impl JsonEvent {
    /// Event for a duplicate pair.
    #[must_use]
    pub fn duplicate(dup: &Duplicate) -> Self {
        Self::Duplicate {
            retained: path_string(&dup.retained),
            relocated: path_string(&dup.relocate),
        }
    }

    /// Event for a relocation.
    #[must_use]
    pub fn relocated(moved: &Relocation) -> Self {
        Self::Move {
            source: path_string(&moved.source),
            destination: moved.destination.as_deref().map(path_string),
        }
    }

    /// Event for the run summary.
    #[must_use]
    pub fn summary(summary: &PipelineSummary) -> Self {
        Self::Summary(JsonSummary::from(summary))
    }

    /// Serialize as a single compact line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur while reporting.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while writing a line
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
}
