//! Decision reporting on stdout.
//!
//! Every duplicate and every relocation produces exactly one line, written
//! under a single lock so lines from concurrent matchers and movers never
//! interleave. Diagnostics go through `log` to stderr instead.
//!
//! Two formats are supported:
//! - text: `Dupe:\t<kept>\t<relocated>` and `Move:\t<src>[\t<dest>]`, with
//!   spaces escaped as `\ ` so the fields split cleanly in a shell. Both
//!   line kinds use the same escaping; `Dupe:` paths are not quoted.
//! - JSON lines: one object per event, see [`json`]
//!
//! # Example
//!
//! ```
//! use dedupe::duplicates::Duplicate;
//! use dedupe::output::{format_duplicate, OutputFormat};
//! use std::path::PathBuf;
//!
//! let dup = Duplicate {
//!     retained: PathBuf::from("/high/my file.txt"),
//!     relocate: PathBuf::from("/low/my file.txt"),
//! };
//! assert_eq!(
//!     format_duplicate(&dup),
//!     "Dupe:\t/high/my\\ file.txt\t/low/my\\ file.txt"
//! );
//! ```

pub mod json;

use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::actions::Relocation;
use crate::duplicates::Duplicate;
use crate::pipeline::PipelineSummary;

pub use json::{JsonEvent, JsonOutputError};

/// Report format for stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated decision lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Thread-safe line writer for run decisions.
pub struct Reporter {
    format: OutputFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("format", &self.format).finish_non_exhaustive()
    }
}

impl Reporter {
    /// Report to an arbitrary writer.
    #[must_use]
    pub fn new(format: OutputFormat, out: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            out: Mutex::new(out),
        }
    }

    /// Report to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, Box::new(io::stdout()))
    }

    /// The active format.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Report a duplicate decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be serialized or written.
    pub fn duplicate(&self, dup: &Duplicate) -> Result<(), JsonOutputError> {
        match self.format {
            OutputFormat::Text => self.write_line(&format_duplicate(dup)),
            OutputFormat::Json => self.write_line(&JsonEvent::duplicate(dup).to_line()?),
        }
    }

    /// Report a completed (or dry-run) relocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be serialized or written.
    pub fn relocated(&self, moved: &Relocation) -> Result<(), JsonOutputError> {
        match self.format {
            OutputFormat::Text => self.write_line(&format_move(moved)),
            OutputFormat::Json => self.write_line(&JsonEvent::relocated(moved).to_line()?),
        }
    }

    /// Report the end-of-run summary. Text mode leaves stdout to the
    /// decision lines and logs the summary instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be serialized or written.
    pub fn summary(&self, summary: &PipelineSummary) -> Result<(), JsonOutputError> {
        match self.format {
            OutputFormat::Text => {
                log::info!("{}", summary);
                Ok(())
            }
            OutputFormat::Json => self.write_line(&JsonEvent::summary(summary).to_line()?),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), JsonOutputError> {
        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// `Dupe:` line for a duplicate pair.
#[must_use]
pub fn format_duplicate(dup: &Duplicate) -> String {
    format!("Dupe:\t{}\t{}", escape(&dup.retained), escape(&dup.relocate))
}

/// `Move:` line; the destination is omitted on a dry run.
#[must_use]
pub fn format_move(moved: &Relocation) -> String {
    match &moved.destination {
        Some(dest) => format!("Move:\t{}\t{}", escape(&moved.source), escape(dest)),
        None => format!("Move:\t{}", escape(&moved.source)),
    }
}

/// Shell-style escaping of spaces.
fn escape(path: &Path) -> String {
    path.to_string_lossy().replace(' ', "\\ ")
}
