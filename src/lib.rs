//! # fuzzykv - Approximate String-Matching Key/Value Index
//!
//! An in-memory map from string keys to string values answering two kinds of
//! lookups: exact `get`, and "the best N keys within edit distance `t` of
//! this string".
//!
//! ## Architecture
//!
//! Keys are bucketed by char length and then by a 32-bit parity histogram of
//! their chars. A fuzzy query only visits the `2t + 1` lengths that can hold
//! a match and prunes in three stages:
//!
//! 1. **Bucket filter**: the parity histograms give a lower bound on the edit
//!    distance for every key in a bucket at once.
//! 2. **Entry filter**: each entry carries a 64-bit saturating-count
//!    histogram with a tighter bound.
//! 3. **Banded Levenshtein**: survivors get an exact distance, computed only
//!    inside the `t`-band and abandoned as soon as a row exceeds `t`.
//!
//! Matches are ranked by common prefix with the query, then distance, then
//! key, and kept in a bounded collector per length before a final merge.
//!
//! ## Example
//!
//! ```rust
//! use fuzzykv::FuzzyIndex;
//!
//! let index = FuzzyIndex::new();
//! index.set("super", "ceva");
//! index.set("supret", "altceva");
//! index.set("supretar", "altceva");
//!
//! assert_eq!(index.get("super").as_deref(), Some("ceva"));
//! assert_eq!(index.query("supre", 2, 1), vec!["supret"]);
//! assert_eq!(index.query("supre", 3, 2), vec!["supret", "supretar"]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buckets;
pub mod distance;
pub mod error;
pub mod histogram;
pub mod query;
pub mod registry;
pub mod topk;

pub use buckets::Buckets;
pub use distance::{bounded_distance, common_prefix_len, edit_distance};
pub use error::{FuzzyError, Result};
pub use histogram::{histogram32, histogram64, lower_bound32, lower_bound64};
pub use query::ScanStats;
pub use registry::{Lookup, Operation, Registry, StoreStatistics};
pub use topk::{KeyScore, TopK};

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::query::PreparedQuery;

/// Shape statistics for the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of distinct keys
    pub keys: usize,
    /// Number of distinct key lengths
    pub lengths: usize,
    /// Number of `(length, histogram)` buckets
    pub buckets: usize,
    /// Entries in the fullest bucket
    pub largest_bucket: usize,
}

/// Configuration for the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan the candidate key lengths of a query on the rayon pool
    pub parallel_query: bool,
    /// Apply the 64-bit histogram filter before computing edit distances
    pub extended_filter: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel_query: true,
            extended_filter: true,
        }
    }
}

/// A concurrent key/value index with exact and approximate lookup.
///
/// Mutations take the write lock. `get` and queries take the read lock; a
/// query holds it for its whole fan-out, so every length it scans sees the
/// same state and writers wait until the query has merged its results.
///
/// Queries acquire the lock with `read_recursive`. A query may run on a rayon
/// worker that already holds a read guard for another query it is joining
/// on, and a queued writer must not stall that worker.
pub struct FuzzyIndex {
    /// The bucketed entries
    inner: RwLock<Buckets>,
    /// Configuration
    config: Config,
}

impl FuzzyIndex {
    /// Create a new empty index with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new index with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: RwLock::new(Buckets::new()),
            config,
        }
    }

    /// The configuration this index was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert or overwrite a key.
    ///
    /// Returns the previous value if the key already existed.
    pub fn set(&self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = key.as_ref();
        let mut inner = self.inner.write();
        let old = inner.insert(key, value.into());
        debug!(key, replaced = old.is_some(), "set");
        old
    }

    /// Insert many pairs under a single write acquisition.
    ///
    /// Returns the number of keys that were not present before.
    pub fn set_many<I, K, V>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut inner = self.inner.write();
        let mut added = 0;
        for (key, value) in pairs {
            if inner.insert(key.as_ref(), value.into()).is_none() {
                added += 1;
            }
        }
        debug!(added, "set_many");
        added
    }

    /// Get the value for a key.
    pub fn get(&self, key: impl AsRef<str>) -> Option<String> {
        let inner = self.inner.read();
        inner.get(key.as_ref()).map(str::to_string)
    }

    /// Check if a key exists in the index.
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        let inner = self.inner.read();
        inner.contains(key.as_ref())
    }

    /// Remove a key.
    ///
    /// Returns true if the key existed.
    pub fn delete(&self, key: impl AsRef<str>) -> bool {
        self.remove(key).is_some()
    }

    /// Remove a key, returning its value if it existed.
    pub fn remove(&self, key: impl AsRef<str>) -> Option<String> {
        let key = key.as_ref();
        let mut inner = self.inner.write();
        let old = inner.remove(key);
        debug!(key, removed = old.is_some(), "remove");
        old
    }

    /// The best `max_results` keys within edit distance `threshold` of
    /// `query`, best first.
    ///
    /// Ranking: longer common prefix with `query` first, then smaller edit
    /// distance, then the lexicographically smaller key.
    pub fn query(&self, query: &str, threshold: usize, max_results: usize) -> Vec<String> {
        let inner = self.inner.read_recursive();
        crate::query::run(&inner, query, threshold, max_results, &self.config)
    }

    /// Like [`FuzzyIndex::query`], but returns the full scores along with
    /// the filter counters.
    pub fn query_scored(
        &self,
        query: &str,
        threshold: usize,
        max_results: usize,
    ) -> (Vec<KeyScore>, ScanStats) {
        let inner = self.inner.read_recursive();
        PreparedQuery::new(query, threshold, max_results, &self.config)
            .execute(&inner, self.config.parallel_query)
    }

    /// Run many queries in parallel against one consistent snapshot.
    ///
    /// Results are returned in the order of `queries`.
    pub fn query_batch<S>(&self, queries: &[S], threshold: usize, max_results: usize) -> Vec<Vec<String>>
    where
        S: AsRef<str> + Sync,
    {
        let inner = self.inner.read_recursive();
        let buckets: &Buckets = &inner;
        queries
            .par_iter()
            .map(|q| crate::query::run(buckets, q.as_ref(), threshold, max_results, &self.config))
            .collect()
    }

    /// Get the number of keys in the index.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get shape statistics.
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats {
            keys: inner.len(),
            lengths: inner.length_count(),
            buckets: inner.bucket_count(),
            largest_bucket: inner.largest_bucket(),
        }
    }
}

impl Default for FuzzyIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod proptests;
