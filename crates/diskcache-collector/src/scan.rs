//! Entry scanner
//!
//! Builds the inventory of every regular file under `ac/` and `cas/`.
//! Each immediate child of a partition is one unit of work on the pool, so
//! large sharded trees are listed and stat'ed in parallel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::layout::{CacheRoot, Partition};
use crate::pool::WorkerPool;

/// One cache file as observed at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the cache root, e.g. `cas/ab/abcdef...`
    pub relative_path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub mtime: SystemTime,
}

impl Entry {
    pub fn new(relative_path: impl Into<PathBuf>, size: u64, mtime: SystemTime) -> Self {
        Self {
            relative_path: relative_path.into(),
            size,
            mtime,
        }
    }

    /// Partition this entry was found in.
    pub fn partition(&self) -> Option<Partition> {
        let first = self.relative_path.components().next()?;
        Partition::from_dir_name(first.as_os_str().to_str()?)
    }

    /// Age of the entry at `now`. Timestamps in the future count as zero.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        now.duration_since(self.mtime).unwrap_or(Duration::ZERO)
    }
}

/// All entries found by one scan, sorted by relative path.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: Vec<Entry>,
}

impl Inventory {
    /// Build an inventory from arbitrary entries. Sorts by relative path.
    pub fn new(mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// Scan both partitions of `root` using `pool` for the listing fan-out.
pub fn scan(root: &CacheRoot, pool: &WorkerPool) -> Inventory {
    let mut units = Vec::new();
    for partition in Partition::ALL {
        let dir = root.partition_dir(partition);
        match fs::read_dir(&dir) {
            Ok(children) => {
                for child in children {
                    match child {
                        Ok(child) => units.push(child.path()),
                        Err(e) => debug!("skipping unreadable entry in {}: {}", dir.display(), e),
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("partition {} does not exist yet", dir.display());
            }
            Err(e) => warn!("cannot list partition {}: {}", dir.display(), e),
        }
    }

    debug!(units = units.len(), threads = pool.threads(), "dispatching scan units");

    let base = root.path();
    let batches = pool.scatter(units, |unit| scan_unit(base, &unit));
    Inventory::new(batches.into_iter().flatten().collect())
}

/// Walk one subtree and stat every regular file in it.
fn scan_unit(base: &Path, unit: &Path) -> Vec<Entry> {
    WalkDir::new(unit)
        .follow_links(false)
        .follow_root_links(false)
        .into_iter()
        .filter_map(|item| match item {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("walk error under {}: {}", unit.display(), e);
                None
            }
        })
        .filter(|item| item.file_type().is_file())
        .filter_map(|item| {
            // May have vanished since listing.
            let meta = match item.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("skipping {}: {}", item.path().display(), e);
                    return None;
                }
            };
            let mtime = meta.modified().ok()?;
            let relative = item.path().strip_prefix(base).ok()?.to_path_buf();
            Some(Entry::new(relative, meta.len(), mtime))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, relative: &str, size: usize) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; size]).unwrap();
    }

    fn paths(inventory: &Inventory) -> Vec<String> {
        inventory
            .entries()
            .iter()
            .map(|e| e.relative_path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_scan_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(2).unwrap();

        let inventory = scan(&root, &pool);
        assert!(inventory.is_empty());
        assert_eq!(inventory.total_size(), 0);
    }

    #[test]
    fn test_scan_finds_nested_entries_sorted() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "cas/ff/ffff", 30);
        write_file(temp_dir.path(), "ac/12/1234", 10);
        write_file(temp_dir.path(), "ac/top", 5);
        write_file(temp_dir.path(), "cas/00/aa/deep", 20);

        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(3).unwrap();
        let inventory = scan(&root, &pool);

        assert_eq!(
            paths(&inventory),
            vec!["ac/12/1234", "ac/top", "cas/00/aa/deep", "cas/ff/ffff"]
        );
        assert_eq!(inventory.total_size(), 65);
        assert_eq!(inventory.get(0).unwrap().partition(), Some(Partition::Ac));
        assert_eq!(inventory.get(3).unwrap().partition(), Some(Partition::Cas));
    }

    #[test]
    fn test_scan_ignores_reserved_and_unknown_dirs() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "tmp/in-flight", 100);
        write_file(temp_dir.path(), "gc/pending", 100);
        write_file(temp_dir.path(), "other/file", 100);
        write_file(temp_dir.path(), "toplevel", 100);
        write_file(temp_dir.path(), "ac/keep", 1);

        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(1).unwrap();
        let inventory = scan(&root, &pool);

        assert_eq!(paths(&inventory), vec!["ac/keep"]);
    }

    #[test]
    fn test_scan_skips_empty_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("ac/empty/shard")).unwrap();
        write_file(temp_dir.path(), "cas/x", 7);

        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(2).unwrap();
        let inventory = scan(&root, &pool);

        assert_eq!(paths(&inventory), vec!["cas/x"]);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..40 {
            write_file(temp_dir.path(), &format!("cas/{:02x}/{}", i % 7, i), i);
        }

        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(4).unwrap();

        let first = scan(&root, &pool);
        let second = scan(&root, &pool);
        assert_eq!(first.entries(), second.entries());
        assert_eq!(first.len(), 40);
    }

    #[test]
    fn test_scan_unit_vanished_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "cas/ab/abcd", 10);
        let unit = temp_dir.path().join("cas/ab");

        // Removed between listing and walking.
        fs::remove_dir_all(&unit).unwrap();
        assert!(scan_unit(temp_dir.path(), &unit).is_empty());
    }

    #[test]
    fn test_scan_unit_lists_regular_files() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "ac/12/a", 3);
        write_file(temp_dir.path(), "ac/12/b", 4);

        let entries = scan_unit(temp_dir.path(), &temp_dir.path().join("ac/12"));
        let mut paths: Vec<_> = entries.iter().map(|e| e.relative_path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("ac/12/a"), PathBuf::from("ac/12/b")]);
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_skips_symlinks() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "ac/real", 8);
        write_file(temp_dir.path(), "outside/target", 1000);
        fs::create_dir_all(temp_dir.path().join("cas/ab")).unwrap();
        symlink(temp_dir.path().join("outside/target"), temp_dir.path().join("ac/link")).unwrap();
        symlink(temp_dir.path().join("nowhere"), temp_dir.path().join("cas/ab/dangling")).unwrap();
        symlink(temp_dir.path().join("outside"), temp_dir.path().join("cas/dirlink")).unwrap();

        let root = CacheRoot::open(temp_dir.path()).unwrap();
        let pool = WorkerPool::new(2).unwrap();
        let inventory = scan(&root, &pool);

        assert_eq!(paths(&inventory), vec!["ac/real"]);
        assert_eq!(inventory.total_size(), 8);
    }

    #[test]
    fn test_entry_age_future_mtime_is_zero() {
        let now = SystemTime::now();
        let entry = Entry::new("ac/x", 1, now + Duration::from_secs(60));
        assert_eq!(entry.age_at(now), Duration::ZERO);

        let old = Entry::new("ac/y", 1, now - Duration::from_secs(60));
        assert_eq!(old.age_at(now), Duration::from_secs(60));
    }
}
