//! diskcache-gc - garbage collection for on-disk build caches
//!
//! This crate wires the collector in `diskcache-collector` to a config file,
//! command-line flags and log output. The collection logic itself lives in
//! that crate and is re-exported here.

pub mod config;
pub mod logging;

pub use config::{CliOverrides, ConfigError, GcConfig, ResolvedConfig};
pub use diskcache_collector::{
    CacheRoot, CollectionOutcome, CollectionPolicy, GarbageCollector, GcError, WorkerPool,
};

/// Build a collector from validated settings.
///
/// The worker pool is created here and owned by the returned collector's
/// handle; callers that already run a rayon pool should build the
/// collector themselves with [`WorkerPool::from_rayon`].
pub fn build_collector(config: &ResolvedConfig) -> Result<GarbageCollector, ConfigError> {
    let root = CacheRoot::open(&config.cache_root)?;
    let pool = WorkerPool::new(config.jobs)?;
    Ok(GarbageCollector::new(root, pool, config.policy).with_dry_run(config.dry_run))
}
