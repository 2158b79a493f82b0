//! Collection run driver
//!
//! One run is scan -> evaluate -> delete. The scan and delete phases fan out
//! over the caller's worker pool and block until every unit has drained;
//! evaluation is pure and single-threaded. Nothing is retried: a run that
//! hits per-entry failures reports them and the next run starts from a
//! fresh scan.

use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::delete::{delete_entries, DeletionFailure, DeletionReport};
use crate::error::GcResult;
use crate::layout::CacheRoot;
use crate::policy::CollectionPolicy;
use crate::pool::WorkerPool;
use crate::scan::{scan, Entry, Inventory};

/// Phase of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Scanning,
    Evaluating,
    Deleting,
    Done,
}

/// Summary of one collection run.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Entries found by the scan
    pub scanned_entries: usize,
    /// Bytes found by the scan
    pub scanned_bytes: u64,
    /// Entries removed, including ones already gone
    pub evicted_entries: usize,
    /// Bytes reclaimed
    pub evicted_bytes: u64,
    /// Entries kept because they changed after the scan
    pub refreshed_entries: usize,
    /// Per-entry deletion failures
    pub failures: Vec<DeletionFailure>,
    pub dry_run: bool,
}

impl CollectionOutcome {
    /// Bytes left in the cache according to this run.
    pub fn remaining_bytes(&self) -> u64 {
        self.scanned_bytes.saturating_sub(self.evicted_bytes)
    }

    /// True when no deletion failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Disk cache garbage collector.
#[derive(Debug)]
pub struct GarbageCollector {
    root: CacheRoot,
    pool: WorkerPool,
    policy: CollectionPolicy,
    dry_run: bool,
}

impl GarbageCollector {
    /// Create a new garbage collector.
    pub fn new(root: CacheRoot, pool: WorkerPool, policy: CollectionPolicy) -> Self {
        Self {
            root,
            pool,
            policy,
            dry_run: false,
        }
    }

    /// Set dry-run mode (evaluate and report, but don't delete).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one collection.
    pub fn run(&self) -> GcResult<CollectionOutcome> {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut phase = GcPhase::Idle;

        // The root may have been removed since construction.
        let root = CacheRoot::open(self.root.path())?;

        advance(&mut phase, GcPhase::Scanning);
        let inventory = scan(&root, &self.pool);
        info!(
            entries = inventory.len(),
            bytes = inventory.total_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scanned {}",
            root.path().display()
        );

        advance(&mut phase, GcPhase::Evaluating);
        let victims = self.evaluate(&inventory, SystemTime::now());

        advance(&mut phase, GcPhase::Deleting);
        let report = if victims.is_empty() {
            DeletionReport::default()
        } else {
            delete_entries(&root, victims, &self.pool, self.dry_run)
        };

        advance(&mut phase, GcPhase::Done);
        let outcome = CollectionOutcome {
            started_at,
            finished_at: Utc::now(),
            scanned_entries: inventory.len(),
            scanned_bytes: inventory.total_size(),
            evicted_entries: report.evicted(),
            evicted_bytes: report.bytes_reclaimed,
            refreshed_entries: report.refreshed,
            failures: report.failures,
            dry_run: self.dry_run,
        };

        if !outcome.is_clean() {
            warn!("{} entries could not be deleted", outcome.failures.len());
        }
        info!(
            evicted = outcome.evicted_entries,
            evicted_bytes = outcome.evicted_bytes,
            refreshed = outcome.refreshed_entries,
            failures = outcome.failures.len(),
            dry_run = self.dry_run,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection finished"
        );

        Ok(outcome)
    }

    /// Select the entries to delete, cloned out of the inventory.
    fn evaluate(&self, inventory: &Inventory, now: SystemTime) -> Vec<Entry> {
        if self.policy.is_noop() {
            debug!("no size or age limit configured, nothing to evict");
            return Vec::new();
        }

        let set = self.policy.evaluate(inventory, now);
        info!(
            victims = set.len(),
            bytes = set.bytes(inventory),
            "evaluated policy"
        );
        set.iter(inventory)
            .map(|(entry, reason)| {
                debug!(?reason, "evicting {}", entry.relative_path.display());
                entry.clone()
            })
            .collect()
    }
}

fn advance(phase: &mut GcPhase, next: GcPhase) {
    debug!(from = ?phase, to = ?next, "gc phase");
    *phase = next;
}
