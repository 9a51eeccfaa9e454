use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the orchestration core.
///
/// Individual scanner failures are never errors; they are recorded as
/// failed [`TestResult`](crate::runner::TestResult)s and aggregated. Only
/// fatal preconditions that prevent a run from starting live here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no supported package manager found on PATH (looked for npm, yarn, pnpm)")]
    NoPackageManager,

    #[error("no security tests available for this configuration")]
    EmptyPlan,

    #[error("failed to create output directory '{path}'")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file '{path}': {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
