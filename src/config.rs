//! Layered run configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config <FILE>`, else `config.toml` in the platform
//!    config directory (skipped if absent)
//! 3. `DEDUPE_*` environment variables, `__` separating nested keys
//!    (`DEDUPE_COMPARE__CONTENTS=true`, `DEDUPE_PIPELINE__MATCHERS=8`)
//! 4. Command-line flags that were actually given
//!
//! The merged [`Config`] is then checked by [`Config::validate`], which
//! resolves paths and produces the [`RunConfig`] the pipeline is built
//! from. Any rejection is a [`ConfigError`] and ends the process with exit
//! code 2 before a single file is touched.
//!
//! ```toml
//! roots = ["/srv/photos", "/mnt/backup/photos"]
//! trash = "/mnt/trash"
//! min_size = 4096
//!
//! [compare]
//! contents = true
//!
//! [pipeline]
//! matchers = 8
//! ```

use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;
use crate::duplicates::PriorityOrder;
use crate::output::OutputFormat;
use crate::pipeline::PipelineConfig;
use crate::scanner::{CompareModes, Hasher, WalkerConfig};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DEDUPE_";

/// Errors that reject a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Every comparison was switched off.
    #[error("at least one compare option must be enabled")]
    NoCompareMode,

    /// Byte comparison only runs behind matching hashes.
    #[error("compare-contents requires compare-hash")]
    ContentsRequiresHash,

    /// Hashing is keyed under the size bucket.
    #[error("compare-hash requires compare-size")]
    HashRequiresSize,

    /// No directory to scan.
    #[error("at least one directory to scan must be given")]
    NoRoots,

    /// A worker pool was sized to zero.
    #[error("{0} must be at least 1")]
    ZeroWorkers(&'static str),

    /// The explicit config file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    /// The trash root does not exist.
    #[error("trash directory does not exist: {0}")]
    TrashNotFound(PathBuf),

    /// The trash root is not a directory.
    #[error("trash path is not a directory: {0}")]
    TrashNotDirectory(PathBuf),

    /// Relocated files would be rediscovered by the scan.
    #[error("trash directory {trash} is inside scanned directory {root}")]
    TrashInsideRoot { trash: PathBuf, root: PathBuf },

    /// A path could not be made absolute.
    #[error("cannot resolve path {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The layered sources could not be merged or parsed.
    #[error("invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Worker counts and queue capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Capacity of the directory queue
    pub scan_buffer: usize,
    /// Scanner threads
    pub scanners: usize,
    /// Capacity of the file queue
    pub match_buffer: usize,
    /// Matcher threads
    pub matchers: usize,
    /// Capacity of the move queue
    pub move_buffer: usize,
    /// Mover threads
    pub movers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            scan_buffer: pipeline.scan_buffer,
            scanners: pipeline.scanners,
            match_buffer: pipeline.match_buffer,
            matchers: pipeline.matchers,
            move_buffer: pipeline.move_buffer,
            movers: pipeline.movers,
        }
    }
}

/// Merged, not yet validated settings.
///
/// Scalars come before tables so the struct serializes to valid TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to scan, highest priority first
    pub roots: Vec<PathBuf>,
    /// Relocation target; dry run when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash: Option<PathBuf>,
    /// Smallest file considered, in bytes
    pub min_size: u64,
    /// Resolve and walk symbolic links
    pub follow_symlinks: bool,
    /// Report format
    pub output: OutputFormat,
    /// Which attributes must agree
    pub compare: CompareModes,
    /// Thread pools and queues
    pub pipeline: PoolConfig,
}

impl Default for Config {
    fn default() -> Self {
        let walker = WalkerConfig::default();
        Self {
            roots: Vec::new(),
            trash: None,
            min_size: walker.min_size,
            follow_symlinks: walker.follow_symlinks,
            output: OutputFormat::default(),
            compare: walker.compare,
            pipeline: PoolConfig::default(),
        }
    }
}

impl Config {
    /// Merge defaults, the config file and the environment.
    ///
    /// `file` is an explicit config path; when `None` the platform default
    /// location is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] for a missing explicit file and
    /// [`ConfigError::Load`] for unparseable sources.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load, then overlay the flags given on the command line.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::load(cli.config.as_deref())?;
        config.apply_cli(cli);
        Ok(config)
    }

    /// Overlay every flag that was given. Positional directories replace
    /// the configured roots entirely.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if !cli.directories.is_empty() {
            self.roots = cli.directories.clone();
        }
        if let Some(trash) = &cli.trash {
            self.trash = Some(trash.clone());
        }

        let compare = &mut self.compare;
        overlay(&mut compare.mod_time, cli.compare_time);
        overlay(&mut compare.name, cli.compare_name);
        overlay(&mut compare.size, cli.compare_size);
        overlay(&mut compare.hash, cli.compare_hash);
        overlay(&mut compare.contents, cli.compare_contents);

        overlay(&mut self.min_size, cli.min_size);
        overlay(&mut self.follow_symlinks, cli.follow_symlinks);
        overlay(&mut self.output, cli.output);

        let pool = &mut self.pipeline;
        overlay(&mut pool.scan_buffer, cli.scan_buffer);
        overlay(&mut pool.scanners, cli.scanners);
        overlay(&mut pool.match_buffer, cli.match_buffer);
        overlay(&mut pool.matchers, cli.matchers);
        overlay(&mut pool.move_buffer, cli.move_buffer);
        overlay(&mut pool.movers, cli.movers);
    }

    /// Render as TOML, for `--print-config`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check the settings and resolve every path to an absolute one.
    ///
    /// Roots that cannot be canonicalized (typically because they do not
    /// exist) are kept as absolute paths with a warning; the walker reports
    /// them again when it gets there.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<RunConfig, ConfigError> {
        let compare = self.compare;
        if !compare.any() {
            return Err(ConfigError::NoCompareMode);
        }
        if compare.contents && !compare.hash {
            return Err(ConfigError::ContentsRequiresHash);
        }
        if compare.hash && !compare.size {
            return Err(ConfigError::HashRequiresSize);
        }
        if self.roots.is_empty() {
            return Err(ConfigError::NoRoots);
        }

        let pool = &self.pipeline;
        for (name, count) in [
            ("scanners", pool.scanners),
            ("matchers", pool.matchers),
            ("movers", pool.movers),
        ] {
            if count == 0 {
                return Err(ConfigError::ZeroWorkers(name));
            }
        }

        let roots = self
            .roots
            .iter()
            .map(|root| resolve_root(root))
            .collect::<Result<Vec<_>, _>>()?;

        let trash = match &self.trash {
            Some(trash) => Some(resolve_trash(trash, &roots)?),
            None => None,
        };

        Ok(RunConfig {
            pipeline: PipelineConfig {
                roots: roots.clone(),
                walker: WalkerConfig {
                    follow_symlinks: self.follow_symlinks,
                    min_size: self.min_size,
                    compare,
                },
                scan_buffer: pool.scan_buffer,
                scanners: pool.scanners,
                match_buffer: pool.match_buffer,
                matchers: pool.matchers,
                move_buffer: pool.move_buffer,
                movers: pool.movers,
            },
            hasher: Hasher::new(compare.hash, compare.contents),
            priority: PriorityOrder::new(roots),
            trash,
            output: self.output,
        })
    }
}

/// Validated settings, ready to build a pipeline from.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Pools, queues, roots and walker filters
    pub pipeline: PipelineConfig,
    /// Digest and comparison switches
    pub hasher: Hasher,
    /// Root priority, same order as `pipeline.roots`
    pub priority: PriorityOrder,
    /// Canonical trash root
    pub trash: Option<PathBuf>,
    /// Report format
    pub output: OutputFormat,
}

/// `config.toml` in the platform config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dedupe").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, ConfigError> {
    match root.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(e) => {
            log::warn!("Path does not exist or is unreadable: {} ({})", root.display(), e);
            std::path::absolute(root).map_err(|source| ConfigError::Path {
                path: root.to_path_buf(),
                source,
            })
        }
    }
}

fn resolve_trash(trash: &Path, roots: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    let canonical = trash.canonicalize().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigError::TrashNotFound(trash.to_path_buf()),
        _ => ConfigError::Path {
            path: trash.to_path_buf(),
            source,
        },
    })?;
    if !canonical.is_dir() {
        return Err(ConfigError::TrashNotDirectory(canonical));
    }
    if let Some(root) = roots.iter().find(|root| canonical.starts_with(root)) {
        return Err(ConfigError::TrashInsideRoot {
            trash: canonical,
            root: root.clone(),
        });
    }
    Ok(canonical)
}
