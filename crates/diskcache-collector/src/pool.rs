//! Bounded worker pool used for scan and delete fan-out
//!
//! The pool is owned by whoever builds it. The collector only borrows it
//! through a cheap cloneable handle and never shuts it down.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{GcError, GcResult};

/// Handle on a fixed-size worker pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Build a pool with exactly `threads` workers.
    pub fn new(threads: usize) -> GcResult<Self> {
        if threads == 0 {
            return Err(GcError::InvalidPolicy(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("diskcache-gc-{}", i))
            .build()?;

        Ok(Self {
            inner: Arc::new(pool),
        })
    }

    /// Wrap a rayon pool the caller already owns.
    pub fn from_rayon(pool: Arc<ThreadPool>) -> Self {
        Self { inner: pool }
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// Run `f` over every item on the pool and gather the results.
    ///
    /// Results come back in input order. Returns only after every unit has
    /// finished.
    pub fn scatter<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        if items.is_empty() {
            return Vec::new();
        }
        self.inner.install(|| items.into_par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pool_rejects_zero_threads() {
        assert!(matches!(WorkerPool::new(0), Err(GcError::InvalidPolicy(_))));
    }

    #[test]
    fn test_pool_thread_count() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.threads(), 3);
    }

    #[test]
    fn test_scatter_preserves_order() {
        let pool = WorkerPool::new(4).unwrap();
        let out = pool.scatter((0..100u32).collect(), |i: u32| i * 2);
        assert_eq!(out, (0..100u32).map(|i| i * 2).collect::<Vec<u32>>());
    }

    #[test]
    fn test_scatter_waits_for_all_units() {
        let pool = WorkerPool::new(2).unwrap();
        let done = AtomicUsize::new(0);

        pool.scatter((0..50).collect(), |_: usize| {
            std::thread::sleep(std::time::Duration::from_millis(1));
            done.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(done.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_from_rayon_shares_pool() {
        let raw = Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap());
        let pool = WorkerPool::from_rayon(Arc::clone(&raw));
        let clone = pool.clone();

        assert_eq!(clone.threads(), 2);
        assert_eq!(Arc::strong_count(&raw), 3);
    }
}
