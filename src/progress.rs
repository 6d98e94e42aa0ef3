//! Live pipeline status on stderr using indicatif.
//!
//! The orchestrator samples its three channels once per tick and hands the
//! [`PipelineSnapshot`] to [`Progress::update`]. The spinner only draws when
//! `--progress` is given and output is not quiet; otherwise the bar is
//! hidden and updates cost nothing.
//!
//! The same snapshot is logged at debug level, which is how channel
//! occupancy shows up in `-vv` logs:
//!
//! ```text
//! Channels: len/cap/count scans=0/100/2 files=87/100/15230 moves=0/100/412
//! ```

use std::fmt;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::PipelineSummary;

/// Default interval between samples.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Occupancy of one bounded channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelGauge {
    /// Messages currently queued
    pub len: usize,
    /// Channel capacity
    pub capacity: usize,
    /// Messages sent so far
    pub sent: usize,
}

impl fmt::Display for ChannelGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.len, self.capacity, self.sent)
    }
}

/// One sample of pipeline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    /// Root paths awaiting a scanner
    pub scans: ChannelGauge,
    /// Files awaiting a matcher
    pub files: ChannelGauge,
    /// Duplicates awaiting a mover
    pub moves: ChannelGauge,
    /// Duplicates found so far
    pub duplicates: usize,
}

impl fmt::Display for PipelineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channels: len/cap/count scans={} files={} moves={}",
            self.scans, self.files, self.moves
        )
    }
}

/// Spinner showing channel occupancy.
#[derive(Debug)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a reporter; draws only when `enabled`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dedupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// assert!(progress.is_hidden());
    /// ```
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        bar.set_message("Starting");
        Self { bar }
    }

    /// A reporter that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Whether nothing will be drawn.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    /// Show a new sample.
    pub fn update(&self, snapshot: &PipelineSnapshot) {
        self.bar.set_message(format!(
            "{} files, {} duplicates | queued: scans {} files {} moves {}",
            snapshot.files.sent,
            snapshot.duplicates,
            snapshot.scans.len,
            snapshot.files.len,
            snapshot.moves.len,
        ));
        self.bar.tick();
    }

    /// Replace the spinner with the final counts.
    pub fn finish(&self, summary: &PipelineSummary) {
        self.bar.finish_with_message(summary.to_string());
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::hidden()
    }
}
