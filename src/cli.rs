//! Command-line interface definitions for dedupe.
//!
//! Every option here is optional at the clap level: anything not given on
//! the command line falls through to the environment, the config file and
//! finally the built-in defaults (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Report duplicates, keeping copies under ~/photos over ~/backup
//! dedupe ~/photos ~/backup
//!
//! # Move the lower-priority copies into a trash directory
//! dedupe --trash /mnt/trash ~/photos ~/backup
//!
//! # Byte-exact comparison, ignore anything under 4 MiB
//! dedupe --compare-contents --min-size 4M ~/photos
//!
//! # Match on name and size only, no hashing
//! dedupe --compare-name --compare-hash=false ~/docs
//! ```

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Concurrent duplicate file finder.
///
/// Scans DIRECTORY trees in priority order. For each pair of duplicates the
/// copy under the earlier directory is kept and the other one is reported,
/// or moved beneath --trash when given. Nothing is ever deleted.
#[derive(Debug, Parser)]
#[command(name = "dedupe")]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// Directories to scan, highest priority first
    #[arg(value_name = "DIRECTORY")]
    pub directories: Vec<PathBuf>,

    /// Move duplicates beneath this directory (dry run when absent)
    ///
    /// The directory must exist and must not lie inside a scanned directory.
    #[arg(long, value_name = "DIR")]
    pub trash: Option<PathBuf>,

    /// Compare file modification times
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub compare_time: Option<bool>,

    /// Compare file names
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub compare_name: Option<bool>,

    /// Compare file sizes [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub compare_size: Option<bool>,

    /// Compare partial and full content hashes [default: true]
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub compare_hash: Option<bool>,

    /// Compare contents byte by byte after hashes match
    ///
    /// Without this, two files whose 64-bit hashes collide are treated as
    /// duplicates. Slower, but rules out false positives.
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub compare_contents: Option<bool>,

    /// Minimum file size to consider (e.g., 4096, 1.5K, 4M, 1GiB, 10MB)
    ///
    /// Single-letter suffixes K, M, G, T, P, E and the KiB forms are binary;
    /// KB, MB, GB, TB are decimal. Fractions are rounded. [default: 1]
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Resolve symbolic links and scan their targets (ignored otherwise)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true", action = ArgAction::Set)]
    pub follow_symlinks: Option<bool>,

    /// Capacity of the directory queue [default: 100]
    #[arg(long, value_name = "N")]
    pub scan_buffer: Option<usize>,

    /// Number of scanner threads [default: 2]
    #[arg(long, value_name = "N")]
    pub scanners: Option<usize>,

    /// Capacity of the file queue [default: 100]
    #[arg(long, value_name = "N")]
    pub match_buffer: Option<usize>,

    /// Number of matcher threads [default: 4]
    #[arg(long, value_name = "N")]
    pub matchers: Option<usize>,

    /// Capacity of the move queue [default: 100]
    #[arg(long, value_name = "N")]
    pub move_buffer: Option<usize>,

    /// Number of mover threads [default: 2]
    #[arg(long, value_name = "N")]
    pub movers: Option<usize>,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format on stdout [default: text]
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Show a live status spinner on stderr
    #[arg(long)]
    pub progress: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Parse a human-readable size into bytes.
///
/// Accepts a plain number, a number with a binary suffix (`K`, `M`, `G`,
/// `T`, `P`, `E`, or `KiB` through `EiB`), or a decimal suffix (`KB`, `MB`,
/// `GB`, `TB`). Case-insensitive; fractional values are rounded to the
/// nearest byte.
///
/// # Errors
///
/// Returns a message for empty, negative, unparseable or overflowing input.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    if matches!(suffix.as_str(), "" | "B") {
        if let Ok(bytes) = num_str.parse::<u64>() {
            return Ok(bytes);
        }
    }

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: f64 = match suffix.as_str() {
        "" | "B" => 1.0,
        "K" | "KIB" => (1u64 << 10) as f64,
        "M" | "MIB" => (1u64 << 20) as f64,
        "G" | "GIB" => (1u64 << 30) as f64,
        "T" | "TIB" => (1u64 << 40) as f64,
        "P" | "PIB" => (1u64 << 50) as f64,
        "E" | "EIB" => (1u64 << 60) as f64,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    let bytes = (num * multiplier).round();
    if bytes >= u64::MAX as f64 {
        return Err(format!("Size too large: '{s}'"));
    }
    Ok(bytes as u64)
}
