//! Logging setup for dedupe.
//!
//! Diagnostics go to stderr through the `log` facade with an `env_logger`
//! backend, so they never interleave with the report on stdout. The level
//! comes from (highest priority first):
//!
//! 1. The `RUST_LOG` environment variable
//! 2. `--quiet` (errors only)
//! 3. `-v` count: warn, info, debug, trace
//!
//! # Example
//!
//! ```rust,no_run
//! use dedupe::logging::init_logging;
//!
//! // -vv: per-file match decisions
//! init_logging(2, false);
//! log::debug!("Partial digest match: /data/a.txt");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logger from CLI verbosity flags.
///
/// Safe to call more than once; later calls are ignored. This keeps
/// integration tests that drive [`crate::run_app`] repeatedly from
/// panicking.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=warn, 1=info, 2=debug, 3+=trace)
/// * `quiet` - Only show errors (overridden by `RUST_LOG`)
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();
    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!("Logging initialized from RUST_LOG: {:?}", env::var("RUST_LOG").ok());
    } else {
        log::debug!("Logging initialized at level: {:?}", determine_level(verbose, quiet));
    }
}

/// Map CLI flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Compact `LEVEL message` lines, with the module path at debug verbosity
/// and above. Debug builds add a timestamp.
fn configure_format(builder: &mut Builder, verbose: u8) {
    let with_module = verbose >= 2;

    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);

        if cfg!(debug_assertions) {
            let timestamp = buf.timestamp_seconds();
            write!(buf, "{} ", timestamp)?;
        }
        if with_module {
            writeln!(
                buf,
                "{style}{:<5}{style:#} [{}] {}",
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });
}

/// Name of the active maximum log level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
