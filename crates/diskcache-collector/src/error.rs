//! Errors that stop a collection run before it touches the cache.
//!
//! Per-entry problems (vanished files, failed unlinks) are never errors at
//! this level; they are folded into the run's outcome instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Collector result type
pub type GcResult<T> = Result<T, GcError>;

/// Errors from collector construction and configuration
#[derive(Debug, Error)]
pub enum GcError {
    #[error("invalid cache root {}: {}", .path.display(), .reason)]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("invalid collection policy: {0}")]
    InvalidPolicy(String),

    #[error("worker pool error: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
