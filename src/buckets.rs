//! Unsynchronized two-level bucket store: key length -> parity histogram -> entries.
//!
//! This is the storage behind [`crate::FuzzyIndex`]. Locking lives in the
//! facade; everything here takes `&self`/`&mut self`.
//!
//! Every entry lives in exactly one `(len, histogram32)` bucket. Empty
//! buckets and empty length groups are removed as soon as they empty out,
//! so a scan never visits a dead container.

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use smallvec::SmallVec;

use crate::histogram::{histogram32, histogram64};

/// A stored key/value pair plus its precomputed extended histogram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// The key.
    pub key: String,
    /// The value, replaced in place when the key is set again.
    pub value: String,
    /// `histogram64(key)`.
    pub extended: u64,
}

/// Entries sharing a length and a parity histogram. Almost always one.
pub type Bucket = SmallVec<[Entry; 1]>;

/// All buckets of one key length, by parity histogram.
pub type LengthGroup = HashMap<u32, Bucket>;

/// The bucketed key/value store.
#[derive(Clone, Debug, Default)]
pub struct Buckets {
    groups: BTreeMap<usize, LengthGroup>,
    len: usize,
}

impl Buckets {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key.
    ///
    /// Returns the previous value if the key already existed.
    pub fn insert(&mut self, key: &str, value: String) -> Option<String> {
        let len = key.chars().count();
        let bucket = self
            .groups
            .entry(len)
            .or_default()
            .entry(histogram32(key))
            .or_default();

        if let Some(entry) = bucket.iter_mut().find(|e| e.key == key) {
            return Some(std::mem::replace(&mut entry.value, value));
        }

        bucket.push(Entry {
            key: key.to_string(),
            value,
            extended: histogram64(key),
        });
        self.len += 1;
        None
    }

    /// Look up the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.groups
            .get(&key.chars().count())?
            .get(&histogram32(key))?
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, pruning its bucket and length group if they empty out.
    ///
    /// Returns the value if the key existed.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let len = key.chars().count();
        let histogram = histogram32(key);

        let group = self.groups.get_mut(&len)?;
        let bucket = group.get_mut(&histogram)?;
        let pos = bucket.iter().position(|e| e.key == key)?;
        let entry = bucket.swap_remove(pos);

        if bucket.is_empty() {
            group.remove(&histogram);
            if group.is_empty() {
                self.groups.remove(&len);
            }
        }
        self.len -= 1;
        Some(entry.value)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty `(length, histogram)` buckets.
    pub fn bucket_count(&self) -> usize {
        self.groups.values().map(HashMap::len).sum()
    }

    /// Number of distinct key lengths.
    pub fn length_count(&self) -> usize {
        self.groups.len()
    }

    /// Size of the fullest bucket.
    pub fn largest_bucket(&self) -> usize {
        self.groups
            .values()
            .flat_map(HashMap::values)
            .map(|b| b.len())
            .max()
            .unwrap_or(0)
    }

    /// Length groups whose key length falls in `lengths`, shortest first.
    pub fn groups_in(
        &self,
        lengths: RangeInclusive<usize>,
    ) -> impl Iterator<Item = (usize, &LengthGroup)> + '_ {
        self.groups.range(lengths).map(|(&len, group)| (len, group))
    }

    /// Iterate over all entries, grouped by length (no order within a length).
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.groups
            .values()
            .flat_map(HashMap::values)
            .flat_map(|bucket| bucket.iter())
    }
}
