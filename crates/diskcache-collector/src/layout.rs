//! On-disk layout of a cache root
//!
//! Directory layout shared with the cache's write path:
//!
//! ```text
//! <root>/
//!   ac/    action results, arbitrary nested sharding
//!   cas/   content blobs, arbitrary nested sharding
//!   tmp/   writer staging area
//!   gc/    reserved collector working area
//! ```
//!
//! Only `ac` and `cas` hold entries. `tmp` and `gc` belong to someone else
//! and are never listed, stat'ed or written by the collector.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{GcError, GcResult};

/// Writer staging area.
pub const TMP_DIR: &str = "tmp";

/// Reserved collector working area.
pub const GC_DIR: &str = "gc";

/// Top-level names that are never treated as cache entries.
pub const RESERVED_DIRS: [&str; 2] = [TMP_DIR, GC_DIR];

/// A top-level cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Partition {
    /// Action results
    Ac,
    /// Content-addressed blobs
    Cas,
}

impl Partition {
    /// Every partition, in scan order.
    pub const ALL: [Partition; 2] = [Partition::Ac, Partition::Cas];

    /// Directory name under the cache root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Cas => "cas",
        }
    }

    /// Parse from a directory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.dir_name() == name)
    }
}

/// Validated handle on a cache root directory.
#[derive(Debug, Clone)]
pub struct CacheRoot {
    path: PathBuf,
}

impl CacheRoot {
    /// Open an existing cache root.
    ///
    /// The directory must exist. The partitions need not: a cache that has
    /// never stored an action result simply has no `ac/` yet.
    pub fn open(path: impl Into<PathBuf>) -> GcResult<Self> {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(Self { path }),
            Ok(_) => Err(GcError::InvalidRoot {
                path,
                reason: "not a directory".to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(GcError::InvalidRoot {
                path,
                reason: "does not exist".to_string(),
            }),
            Err(e) => Err(GcError::Io(e)),
        }
    }

    /// The cache root itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.path.join(partition.dir_name())
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.path.join(TMP_DIR)
    }

    pub fn gc_dir(&self) -> PathBuf {
        self.path.join(GC_DIR)
    }

    /// Absolute path of an entry given its root-relative path.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.path.join(relative)
    }

    /// Partition a root-relative path lives in.
    ///
    /// Returns `None` for anything that is not strictly inside `ac/` or `cas/`,
    /// including the partition directories themselves and paths that try to
    /// climb out with `..`.
    pub fn partition_of(&self, relative: &Path) -> Option<Partition> {
        let mut components = relative.components();
        let partition = match components.next()? {
            Component::Normal(name) => Partition::from_dir_name(name.to_str()?)?,
            _ => return None,
        };

        let mut has_rest = false;
        for component in components {
            match component {
                Component::Normal(_) => has_rest = true,
                _ => return None,
            }
        }
        has_rest.then_some(partition)
    }

    /// Whether a root-relative path falls under `tmp/` or `gc/`.
    pub fn is_reserved(&self, relative: &Path) -> bool {
        match relative.components().next() {
            Some(Component::Normal(name)) => RESERVED_DIRS.iter().any(|r| name == *r),
            _ => false,
        }
    }
}
