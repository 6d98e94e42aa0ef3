//! Dedupe - Concurrent Duplicate File Finder
//!
//! Walks one or more directory trees in priority order, finds files whose
//! configured attributes (and optionally content) match, and relocates the
//! lower-priority copy of every duplicate pair into a trash directory that
//! mirrors its original path.
//!
//! Matching is progressive: a file is only hashed once a second file with
//! the same attributes shows up, and only fully hashed once a second file
//! with the same leading bytes does. See [`duplicates`] and [`pipeline`].

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;

use anyhow::Context;

use crate::actions::Relocator;
use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::MatchIndex;
use crate::error::ExitCode;
use crate::output::Reporter;
use crate::pipeline::Pipeline;
use crate::progress::Progress;

/// Run the application for parsed arguments.
///
/// Returns [`ExitCode::GeneralError`] when a worker panicked,
/// [`ExitCode::Interrupted`] when Ctrl+C cut the run short and
/// [`ExitCode::Success`] otherwise. Configuration problems surface as a
/// [`config::ConfigError`] somewhere in the error chain.
///
/// # Errors
///
/// Returns an error if the configuration is rejected, the signal handler
/// cannot be installed or the summary cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    log::debug!("Log level: {}", logging::current_level_name());

    let config = Config::from_cli(&cli).context("loading configuration")?;

    if cli.print_config {
        let rendered = config.to_toml().context("rendering configuration")?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        return Ok(ExitCode::Success);
    }

    let run = config.validate()?;
    log::info!(
        "Scanning {} root(s), compare {:?}, min size {}",
        run.pipeline.roots.len(),
        run.pipeline.walker.compare,
        run.pipeline.walker.min_size
    );
    if run.trash.is_none() {
        log::info!("No trash directory given, running dry");
    }

    let handler = signal::install_handler().context("installing Ctrl+C handler")?;

    let index = MatchIndex::new(run.hasher, run.priority);
    let reporter = Reporter::stdout(run.output);
    let progress = Progress::new(cli.progress && !cli.quiet);

    let pipeline = Pipeline::new(run.pipeline, index, Relocator::new(run.trash), reporter)
        .with_shutdown_flag(handler.get_flag())
        .with_progress(progress);
    let summary = pipeline.run();

    if summary.worker_panics > 0 {
        log::error!("{} worker thread(s) panicked", summary.worker_panics);
    }

    pipeline
        .reporter()
        .summary(&summary)
        .context("writing summary")?;

    Ok(ExitCode::for_summary(&summary))
}
