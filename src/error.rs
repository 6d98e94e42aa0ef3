//! Structured error handling and exit codes.

use serde::Serialize;

use crate::config::ConfigError;
use crate::pipeline::PipelineSummary;

/// Exit codes for dedupe.
///
/// - 0: Success (run completed, whether or not duplicates were found)
/// - 1: General error (unexpected failure, or a worker panicked)
/// - 2: Configuration error (nothing was scanned or moved)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Configuration error: options were rejected before any work started.
    ConfigError = 2,
    /// Interrupted: the run was cut short by Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DD000",
            Self::GeneralError => "DD001",
            Self::ConfigError => "DD002",
            Self::Interrupted => "DD130",
        }
    }

    /// Pick the exit code for an error that reached `main`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if err.chain().any(|cause| cause.downcast_ref::<ConfigError>().is_some()) {
            Self::ConfigError
        } else {
            Self::GeneralError
        }
    }

    /// Pick the exit code for a completed run.
    ///
    /// A worker panic outranks an interruption.
    #[must_use]
    pub fn for_summary(summary: &PipelineSummary) -> Self {
        if summary.worker_panics > 0 {
            Self::GeneralError
        } else if summary.interrupted {
            Self::Interrupted
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DD002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
