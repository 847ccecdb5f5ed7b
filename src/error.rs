//! Error types for bootstrap runs.
//!
//! [`BootstrapError`] is the domain error shared by every stage of an install
//! run. [`StageError`] pairs it with the [`Stage`] the run was in, which is what
//! the user gets to see when a run ends in `FAILED`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code used when another installer run holds the lock (`EX_TEMPFAIL`).
pub const EXIT_IN_PROGRESS: i32 = 75;

/// Core error type for bootstrap operations.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The host runtime is missing or older than the minimum version.
    #[error("unsupported runtime: `{command}` reports {found}, pkm requires >= {required}")]
    UnsupportedRuntime {
        command: String,
        found: String,
        required: String,
    },

    /// None of the candidate roots can host an isolated container.
    #[error("no writable isolated location among: {}", join_paths(.candidates))]
    NoWritableLocation { candidates: Vec<PathBuf> },

    /// Isolation could not be established or confirmed.
    #[error("isolation conflict: {reason}")]
    ConflictDetected { reason: String },

    /// Another run holds the container lock.
    #[error("another installer run is active (lock {}, held by {holder})", .lock.display())]
    InstallInProgress { lock: PathBuf, holder: String },

    /// Network access to the index or the payload failed or timed out.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The downloaded payload does not match the digest published in the index.
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// The payload is not a valid pkm payload.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// The requested version is not published in the index.
    #[error("version {requested} is not available in the release index")]
    VersionNotFound { requested: String },

    /// The payload is older than the installed version and `--force` was not given.
    #[error("refusing to downgrade pkm {installed} to {requested} (use --force)")]
    DowngradeRefused { installed: String, requested: String },

    /// No container marker was found where one was expected.
    #[error("no pkm container found at {}", .root.display())]
    NotInstalled { root: PathBuf },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration at {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    /// I/O failure with the operation that caused it.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BootstrapError {
    /// Wraps an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BootstrapError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::InstallInProgress { .. } => EXIT_IN_PROGRESS,
            _ => 1,
        }
    }
}

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// The stages of one install run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detecting,
    TargetResolved,
    Materializing,
    Verifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detecting => "DETECTING",
            Stage::TargetResolved => "TARGET_RESOLVED",
            Stage::Materializing => "MATERIALIZING",
            Stage::Verifying => "VERIFYING",
        };
        f.write_str(name)
    }
}

/// A failed run: the stage it stopped in and why.
#[derive(Debug, Error)]
#[error("install failed during {stage}: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: BootstrapError,
}

impl StageError {
    pub fn new(stage: Stage, source: BootstrapError) -> Self {
        StageError { stage, source }
    }

    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none configured>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
