//! Three-stage discovery, matching and relocation pipeline.
//!
//! # Overview
//!
//! ```text
//!  roots ──► [scans] ──► scanners ──► [files] ──► matchers ──► [moves] ──► movers
//!                        (Walker)                 (MatchIndex)              (Relocator)
//! ```
//!
//! Each `[...]` is a bounded `crossbeam-channel` queue, so a slow stage
//! applies backpressure to the one before it. Each pool is a fixed set of
//! scoped threads.
//!
//! Shutdown is strictly sequenced. The orchestrator owns the only original
//! sender of each channel: it seeds every root and closes the scan channel,
//! joins the scanners, closes the file channel, joins the matchers, closes
//! the move channel and joins the movers. Every stage therefore drains
//! completely before the next one sees end of input, and no thread outlives
//! [`Pipeline::run`].
//!
//! On Ctrl+C, walkers stop yielding, seeding stops and matchers drain their
//! queue without classifying. Relocations already decided still complete.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{self as channel, select};

use crate::actions::Relocator;
use crate::duplicates::{MatchIndex, MatchSummary};
use crate::output::Reporter;
use crate::progress::{ChannelGauge, PipelineSnapshot, Progress, TICK_INTERVAL};
use crate::scanner::{FileDescriptor, VisitedSet, Walker, WalkerConfig};

/// Worker counts and channel capacities.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Roots to scan, highest priority first
    pub roots: Vec<PathBuf>,
    /// Filters and attributes for discovered files
    pub walker: WalkerConfig,
    /// Capacity of the root-path channel
    pub scan_buffer: usize,
    /// Scanner threads
    pub scanners: usize,
    /// Capacity of the file-descriptor channel
    pub match_buffer: usize,
    /// Matcher threads
    pub matchers: usize,
    /// Capacity of the relocation channel
    pub move_buffer: usize,
    /// Mover threads
    pub movers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            walker: WalkerConfig::default(),
            scan_buffer: 100,
            scanners: 2,
            match_buffer: 100,
            matchers: 4,
            move_buffer: 100,
            movers: 2,
        }
    }
}

/// The three stages, in shutdown order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Root paths to scanners
    Discovery,
    /// File descriptors to matchers
    Matching,
    /// Duplicate paths to movers
    Relocation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Discovery => write!(f, "discovery"),
            Stage::Matching => write!(f, "matching"),
            Stage::Relocation => write!(f, "relocation"),
        }
    }
}

/// Lifecycle of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Input still being produced
    Seeding,
    /// Input closed, workers finishing the queue
    Draining,
    /// All workers joined
    Closed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Seeding => write!(f, "seeding"),
            StageState::Draining => write!(f, "draining"),
            StageState::Closed => write!(f, "closed"),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Roots seeded into discovery
    pub roots: usize,
    /// Files sent to the matchers
    pub files_discovered: usize,
    /// Traversal errors, logged and skipped
    pub scan_errors: usize,
    /// Match index counters
    pub matches: MatchSummary,
    /// Successful (or dry-run) relocations
    pub relocated: usize,
    /// Failed relocations
    pub relocation_failures: usize,
    /// Workers that panicked
    pub worker_panics: usize,
    /// Whether shutdown was requested mid-run
    pub interrupted: bool,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {} duplicates, {} relocated ({} failed), {} scan errors, {} hash errors in {:.2?}",
            self.files_discovered,
            self.matches.duplicates,
            self.relocated,
            self.relocation_failures,
            self.scan_errors,
            self.matches.hash_errors,
            self.elapsed,
        )?;
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Counters shared by all workers of one run.
#[derive(Debug, Default)]
struct Counters {
    roots: AtomicUsize,
    files: AtomicUsize,
    scan_errors: AtomicUsize,
    moves: AtomicUsize,
    relocated: AtomicUsize,
    relocation_failures: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}

/// Drives one deduplication run.
///
/// # Example
///
/// ```no_run
/// use dedupe::actions::Relocator;
/// use dedupe::duplicates::{MatchIndex, PriorityOrder};
/// use dedupe::output::{OutputFormat, Reporter};
/// use dedupe::pipeline::{Pipeline, PipelineConfig};
/// use dedupe::scanner::Hasher;
/// use std::path::PathBuf;
///
/// let roots = vec![PathBuf::from("/keep"), PathBuf::from("/maybe")];
/// let config = PipelineConfig { roots: roots.clone(), ..Default::default() };
/// let index = MatchIndex::new(Hasher::new(true, true), PriorityOrder::new(roots));
///
/// let pipeline = Pipeline::new(config, index, Relocator::new(None), Reporter::stdout(OutputFormat::Text));
/// let summary = pipeline.run();
/// println!("{}", summary);
/// ```
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    index: MatchIndex,
    relocator: Relocator,
    reporter: Reporter,
    progress: Progress,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    /// Assemble a pipeline from its parts.
    #[must_use]
    pub fn new(config: PipelineConfig, index: MatchIndex, relocator: Relocator, reporter: Reporter) -> Self {
        Self {
            config,
            index,
            relocator,
            reporter,
            progress: Progress::hidden(),
            shutdown_flag: None,
        }
    }

    /// Set a shutdown flag for graceful interruption.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Show live status on stderr.
    #[must_use]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The match index, for inspecting state after a run.
    #[must_use]
    pub fn index(&self) -> &MatchIndex {
        &self.index
    }

    /// Where events are written.
    #[must_use]
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run all three stages to completion.
    ///
    /// Blocks until every worker has exited. Per-file failures are logged
    /// and counted in the summary, never returned.
    pub fn run(&self) -> PipelineSummary {
        let start = Instant::now();
        let config = &self.config;
        let counters = Counters::default();
        let visited = Arc::new(VisitedSet::new());

        let (scan_tx, scan_rx) = channel::bounded::<PathBuf>(config.scan_buffer);
        let (file_tx, file_rx) = channel::bounded::<FileDescriptor>(config.match_buffer);
        let (move_tx, move_rx) = channel::bounded::<PathBuf>(config.move_buffer);
        let (done_tx, done_rx) = channel::bounded::<()>(0);

        let mut worker_panics = 0;
        log::debug!(
            "Starting pipeline: {} scanners, {} matchers, {} movers",
            config.scanners,
            config.matchers,
            config.movers
        );

        thread::scope(|s| {
            let counters = &counters;

            let ticker = (!self.progress.is_hidden() || log::log_enabled!(log::Level::Debug)).then(|| {
                let channels = (scan_rx.clone(), file_rx.clone(), move_rx.clone());
                let done_rx = done_rx.clone();
                s.spawn(move || self.tick(&channels.0, &channels.1, &channels.2, &done_rx, counters))
            });

            let movers: Vec<_> = (0..config.movers.max(1))
                .map(|n| {
                    let rx = move_rx.clone();
                    s.spawn(move || self.mover(n, &rx, counters))
                })
                .collect();

            let matchers: Vec<_> = (0..config.matchers.max(1))
                .map(|n| {
                    let rx = file_rx.clone();
                    let tx = move_tx.clone();
                    s.spawn(move || self.matcher(n, &rx, &tx, counters))
                })
                .collect();

            let scanners: Vec<_> = (0..config.scanners.max(1))
                .map(|n| {
                    let rx = scan_rx.clone();
                    let tx = file_tx.clone();
                    let visited = Arc::clone(&visited);
                    s.spawn(move || self.scanner(n, &rx, &tx, visited, counters))
                })
                .collect();

            drop((scan_rx, file_rx, move_rx, done_rx));

            // Seeding
            log_state(Stage::Discovery, StageState::Seeding);
            for root in &config.roots {
                if self.is_shutdown_requested() {
                    log::info!("Shutdown requested, not seeding remaining roots");
                    break;
                }
                if scan_tx.send(root.clone()).is_err() {
                    log::error!("All scanners exited early");
                    break;
                }
                Counters::bump(&counters.roots);
            }

            drop(scan_tx);
            log_state(Stage::Discovery, StageState::Draining);
            worker_panics += join_stage(Stage::Discovery, scanners);
            log_state(Stage::Discovery, StageState::Closed);

            drop(file_tx);
            log_state(Stage::Matching, StageState::Draining);
            worker_panics += join_stage(Stage::Matching, matchers);
            log_state(Stage::Matching, StageState::Closed);

            drop(move_tx);
            log_state(Stage::Relocation, StageState::Draining);
            worker_panics += join_stage(Stage::Relocation, movers);
            log_state(Stage::Relocation, StageState::Closed);

            drop(done_tx);
            if let Some(handle) = ticker {
                if handle.join().is_err() {
                    log::error!("Progress ticker panicked");
                }
            }
        });

        let summary = PipelineSummary {
            roots: Counters::get(&counters.roots),
            files_discovered: Counters::get(&counters.files),
            scan_errors: Counters::get(&counters.scan_errors),
            matches: self.index.stats(),
            relocated: Counters::get(&counters.relocated),
            relocation_failures: Counters::get(&counters.relocation_failures),
            worker_panics,
            interrupted: self.is_shutdown_requested(),
            elapsed: start.elapsed(),
        };
        self.progress.finish(&summary);
        log::debug!("Pipeline finished: {}", summary);
        summary
    }

    fn scanner(
        &self,
        num: usize,
        roots: &channel::Receiver<PathBuf>,
        files: &channel::Sender<FileDescriptor>,
        visited: Arc<VisitedSet>,
        counters: &Counters,
    ) {
        log::debug!("Scanner {} starting", num);
        let mut walker = Walker::new(self.config.walker.clone(), visited);
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        'roots: for root in roots.iter() {
            log::debug!("Scanner {} walking {}", num, root.display());
            for entry in walker.walk(&root) {
                match entry {
                    Ok(file) => {
                        if files.send(file).is_err() {
                            break 'roots;
                        }
                        Counters::bump(&counters.files);
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        Counters::bump(&counters.scan_errors);
                    }
                }
            }
        }
        log::debug!("Scanner {} done", num);
    }

    fn matcher(
        &self,
        num: usize,
        files: &channel::Receiver<FileDescriptor>,
        moves: &channel::Sender<PathBuf>,
        counters: &Counters,
    ) {
        log::debug!("Matcher {} starting", num);
        for file in files.iter() {
            if self.is_shutdown_requested() {
                continue;
            }
            log::trace!("Matcher {} working on {}", num, file.path.display());

            let Some(dup) = self.index.classify(&file) else {
                continue;
            };
            if let Err(e) = self.reporter.duplicate(&dup) {
                log::error!("Failed to report duplicate: {}", e);
            }
            if moves.send(dup.relocate).is_err() {
                log::error!("All movers exited early");
                break;
            }
            Counters::bump(&counters.moves);
        }
        log::debug!("Matcher {} done", num);
    }

    fn mover(&self, num: usize, moves: &channel::Receiver<PathBuf>, counters: &Counters) {
        log::debug!("Mover {} starting", num);
        for path in moves.iter() {
            match self.relocator.relocate(&path) {
                Ok(moved) => {
                    Counters::bump(&counters.relocated);
                    if let Err(e) = self.reporter.relocated(&moved) {
                        log::error!("Failed to report move: {}", e);
                    }
                }
                Err(e) => {
                    log::error!("{}", e);
                    Counters::bump(&counters.relocation_failures);
                }
            }
        }
        log::debug!("Mover {} done", num);
    }

    /// Sample channel occupancy once per tick until `done` disconnects.
    fn tick(
        &self,
        scans: &channel::Receiver<PathBuf>,
        files: &channel::Receiver<FileDescriptor>,
        moves: &channel::Receiver<PathBuf>,
        done: &channel::Receiver<()>,
        counters: &Counters,
    ) {
        let ticker = channel::tick(TICK_INTERVAL);
        loop {
            select! {
                recv(done) -> _ => break,
                recv(ticker) -> _ => {
                    let snapshot = PipelineSnapshot {
                        scans: gauge(scans, Counters::get(&counters.roots)),
                        files: gauge(files, Counters::get(&counters.files)),
                        moves: gauge(moves, Counters::get(&counters.moves)),
                        duplicates: self.index.stats().duplicates,
                    };
                    log::debug!("{}", snapshot);
                    self.progress.update(&snapshot);
                }
            }
        }
    }
}

fn gauge<T>(rx: &channel::Receiver<T>, sent: usize) -> ChannelGauge {
    ChannelGauge {
        len: rx.len(),
        capacity: rx.capacity().unwrap_or(0),
        sent,
    }
}

fn log_state(stage: Stage, state: StageState) {
    log::debug!("Stage {}: {}", stage, state);
}

/// Join every worker of a stage, returning how many panicked.
fn join_stage(stage: Stage, handles: Vec<ScopedJoinHandle<'_, ()>>) -> usize {
    let mut panics = 0;
    for handle in handles {
        if handle.join().is_err() {
            log::error!("A {} worker panicked", stage);
            panics += 1;
        }
    }
    panics
}
