//! Disk cache garbage collector
//!
//! Keeps an on-disk, content-addressed build cache under a size and/or age
//! bound while the cache's writer keeps using it.
//!
//! A run is three phases:
//! - **scan**: inventory every file under `ac/` and `cas/`
//! - **evaluate**: pick victims as the union of the size and age limits
//! - **delete**: unlink victims idempotently, collecting per-entry failures
//!
//! `tmp/` (writer staging) and `gc/` (reserved) are never read or written.
//! The collector takes no locks; it relies on idempotent deletes and on
//! tolerating files that vanish under it.
//!
//! ```no_run
//! use std::time::Duration;
//! use diskcache_collector::{CacheRoot, CollectionPolicy, GarbageCollector, WorkerPool};
//!
//! let root = CacheRoot::open("/var/cache/build")?;
//! let pool = WorkerPool::new(4)?;
//! let policy = CollectionPolicy::new(Some(10 << 30), Some(Duration::from_secs(14 * 86400)));
//!
//! let outcome = GarbageCollector::new(root, pool, policy).run()?;
//! println!("evicted {} entries", outcome.evicted_entries);
//! # Ok::<(), diskcache_collector::GcError>(())
//! ```

pub mod collector;
pub mod delete;
pub mod error;
pub mod layout;
pub mod policy;
pub mod pool;
pub mod scan;

pub use collector::{CollectionOutcome, GarbageCollector, GcPhase};
pub use delete::{delete_entries, delete_entry, DeletionFailure, DeletionReport, DeletionStatus};
pub use error::{GcError, GcResult};
pub use layout::{CacheRoot, Partition, GC_DIR, RESERVED_DIRS, TMP_DIR};
pub use policy::{age_victims, size_victims, CollectionPolicy, EvictionReason, EvictionSet};
pub use pool::WorkerPool;
pub use scan::{scan, Entry, Inventory};
