//! Deletion executor
//!
//! Removes evicted entries concurrently, one pool task per entry. Every
//! deletion is idempotent: a file that is already gone counts as removed.
//! Failures are collected per entry and never stop the rest of the batch.
//!
//! Only files strictly inside `ac/` or `cas/` are ever unlinked. Directories
//! are left alone, even when they end up empty.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::layout::CacheRoot;
use crate::pool::WorkerPool;
use crate::scan::Entry;

/// What happened to a single evicted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionStatus {
    /// File was unlinked
    Removed { bytes: u64 },
    /// File no longer existed
    AlreadyGone,
    /// File was modified after the scan and was kept
    Refreshed,
    /// Dry run, nothing was unlinked
    DryRun { bytes: u64 },
    /// Unlink failed
    Failed(String),
}

/// A per-entry deletion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    /// Path relative to the cache root
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate result of one deletion phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Entries unlinked (or that would be, in a dry run)
    pub removed: usize,
    /// Entries that had already disappeared
    pub already_gone: usize,
    /// Entries kept because they changed after the scan
    pub refreshed: usize,
    /// Bytes freed (or that would be, in a dry run)
    pub bytes_reclaimed: u64,
    /// Errors encountered (non-fatal)
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    /// Fold one entry's status into the report.
    pub fn record(&mut self, entry: &Entry, status: DeletionStatus) {
        match status {
            DeletionStatus::Removed { bytes } | DeletionStatus::DryRun { bytes } => {
                self.removed += 1;
                self.bytes_reclaimed += bytes;
            }
            DeletionStatus::AlreadyGone => self.already_gone += 1,
            DeletionStatus::Refreshed => self.refreshed += 1,
            DeletionStatus::Failed(reason) => self.failures.push(DeletionFailure {
                path: entry.relative_path.clone(),
                reason,
            }),
        }
    }

    /// Entries that are no longer in the cache (or would not be, in a dry run).
    pub fn evicted(&self) -> usize {
        self.removed + self.already_gone
    }
}

/// Delete every entry in `victims` on `pool`.
pub fn delete_entries(
    root: &CacheRoot,
    victims: Vec<Entry>,
    pool: &WorkerPool,
    dry_run: bool,
) -> DeletionReport {
    let statuses = pool.scatter(victims, |entry| {
        let status = delete_entry(root, &entry, dry_run);
        (entry, status)
    });

    statuses
        .into_iter()
        .fold(DeletionReport::default(), |mut report, (entry, status)| {
            report.record(&entry, status);
            report
        })
}

/// Delete one entry.
pub fn delete_entry(root: &CacheRoot, entry: &Entry, dry_run: bool) -> DeletionStatus {
    if root.partition_of(&entry.relative_path).is_none() {
        let reason = if root.is_reserved(&entry.relative_path) {
            "path is in a reserved directory"
        } else {
            "path is outside ac/ and cas/"
        };
        warn!("refusing to delete {}: {}", entry.relative_path.display(), reason);
        return DeletionStatus::Failed(reason.to_string());
    }

    let path = root.resolve(&entry.relative_path);
    let meta = match fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already gone", entry.relative_path.display());
            return DeletionStatus::AlreadyGone;
        }
        Err(e) => {
            warn!("failed to stat {}: {}", path.display(), e);
            return DeletionStatus::Failed(format!("stat failed: {}", e));
        }
    };

    if !meta.is_file() {
        return DeletionStatus::Failed("no longer a regular file".to_string());
    }

    // Reads refresh the mtime; a newer timestamp means the entry is in use.
    if let Ok(mtime) = meta.modified() {
        if mtime > entry.mtime {
            debug!(
                "keeping {}: modified since scan",
                entry.relative_path.display()
            );
            return DeletionStatus::Refreshed;
        }
    }

    if dry_run {
        debug!(
            "DRY-RUN: would delete {} ({} bytes)",
            entry.relative_path.display(),
            meta.len()
        );
        return DeletionStatus::DryRun { bytes: meta.len() };
    }

    match fs::remove_file(&path) {
        Ok(()) => {
            debug!(
                "deleted {} ({} bytes)",
                entry.relative_path.display(),
                meta.len()
            );
            DeletionStatus::Removed { bytes: meta.len() }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => DeletionStatus::AlreadyGone,
        Err(e) => {
            warn!("failed to delete {}: {}", path.display(), e);
            DeletionStatus::Failed(e.to_string())
        }
    }
}
