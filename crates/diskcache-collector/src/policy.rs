//! Eviction policy evaluation
//!
//! Two independent limits:
//! - size: keep total bytes at or under N, evicting oldest first
//! - age: evict anything whose mtime is at least N old
//!
//! Each limit is evaluated on its own over the untouched inventory and the
//! two victim sets are unioned.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::error::{GcError, GcResult};
use crate::scan::{Entry, Inventory};

/// Collection policy. An unset limit contributes no evictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionPolicy {
    /// Maximum total bytes retained across `ac` + `cas`
    pub max_size_bytes: Option<u64>,
    /// Maximum entry age
    pub max_age: Option<Duration>,
}

impl CollectionPolicy {
    pub fn new(max_size_bytes: Option<u64>, max_age: Option<Duration>) -> Self {
        Self {
            max_size_bytes,
            max_age,
        }
    }

    /// Create a size-only policy.
    pub fn size_only(max_size_bytes: u64) -> Self {
        Self::new(Some(max_size_bytes), None)
    }

    /// Create an age-only policy.
    pub fn age_only(max_age: Duration) -> Self {
        Self::new(None, Some(max_age))
    }

    /// Build a policy from raw, possibly negative, configuration values.
    pub fn from_signed(max_size_bytes: Option<i64>, max_age_secs: Option<i64>) -> GcResult<Self> {
        let max_size_bytes = match max_size_bytes {
            Some(n) if n < 0 => {
                return Err(GcError::InvalidPolicy(format!(
                    "max size must not be negative, got {}",
                    n
                )))
            }
            Some(n) => Some(n as u64),
            None => None,
        };
        let max_age = match max_age_secs {
            Some(n) if n < 0 => {
                return Err(GcError::InvalidPolicy(format!(
                    "max age must not be negative, got {}s",
                    n
                )))
            }
            Some(n) => Some(Duration::from_secs(n as u64)),
            None => None,
        };
        Ok(Self::new(max_size_bytes, max_age))
    }

    /// True when neither limit is set.
    pub fn is_noop(&self) -> bool {
        self.max_size_bytes.is_none() && self.max_age.is_none()
    }

    /// Compute the eviction set for `inventory` as of `now`.
    pub fn evaluate(&self, inventory: &Inventory, now: SystemTime) -> EvictionSet {
        let mut set = EvictionSet::default();
        if let Some(max_size) = self.max_size_bytes {
            for index in size_victims(inventory, max_size) {
                set.add(index, EvictionReason::Size);
            }
        }
        if let Some(max_age) = self.max_age {
            for index in age_victims(inventory, max_age, now) {
                set.add(index, EvictionReason::Age);
            }
        }
        set
    }
}

/// Oldest-first order with relative path as tie-break.
fn oldest_first(a: &Entry, b: &Entry) -> Ordering {
    a.mtime
        .cmp(&b.mtime)
        .then_with(|| a.relative_path.cmp(&b.relative_path))
}

/// Indices of the shortest oldest-first prefix whose removal brings the
/// remaining total to `max_size` or below.
pub fn size_victims(inventory: &Inventory, max_size: u64) -> Vec<usize> {
    let entries = inventory.entries();
    let mut remaining = inventory.total_size();
    if remaining <= max_size {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| oldest_first(&entries[a], &entries[b]));

    let mut victims = Vec::new();
    for index in order {
        if remaining <= max_size {
            break;
        }
        remaining -= entries[index].size;
        victims.push(index);
    }
    victims
}

/// Indices of every entry at least `max_age` old at `now`.
pub fn age_victims(inventory: &Inventory, max_age: Duration, now: SystemTime) -> Vec<usize> {
    inventory
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.age_at(now) >= max_age)
        .map(|(index, _)| index)
        .collect()
}

/// Which limit selected an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    Size,
    Age,
    SizeAndAge,
}

impl EvictionReason {
    fn merge(self, other: EvictionReason) -> EvictionReason {
        if self == other {
            self
        } else {
            EvictionReason::SizeAndAge
        }
    }
}

/// Entries chosen for removal, as indices into the inventory they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionSet {
    victims: BTreeMap<usize, EvictionReason>,
}

impl EvictionSet {
    fn add(&mut self, index: usize, reason: EvictionReason) {
        self.victims
            .entry(index)
            .and_modify(|r| *r = r.merge(reason))
            .or_insert(reason);
    }

    pub fn len(&self) -> usize {
        self.victims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.victims.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.victims.contains_key(&index)
    }

    pub fn reason(&self, index: usize) -> Option<EvictionReason> {
        self.victims.get(&index).copied()
    }

    /// Inventory indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.victims.keys().copied()
    }

    /// Victims resolved against the inventory they were computed from.
    pub fn iter<'a>(
        &'a self,
        inventory: &'a Inventory,
    ) -> impl Iterator<Item = (&'a Entry, EvictionReason)> + 'a {
        self.victims
            .iter()
            .filter_map(move |(&index, &reason)| inventory.get(index).map(|e| (e, reason)))
    }

    /// Total bytes of all victims.
    pub fn bytes(&self, inventory: &Inventory) -> u64 {
        self.iter(inventory).map(|(e, _)| e.size).sum()
    }
}
