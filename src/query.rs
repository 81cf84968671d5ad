//! Fuzzy query execution over a [`Buckets`] snapshot.
//!
//! A query for `q` within distance `t` only needs key lengths in
//! `[len(q) - t, len(q) + t]`. Each such length is scanned independently:
//!
//! 1. skip a whole `(length, histogram32)` bucket when [`lower_bound32`]
//!    already exceeds `t`;
//! 2. skip an entry when [`lower_bound64`] exceeds `t`;
//! 3. run [`bounded_distance_chars`] on the survivors.
//!
//! Every length folds its matches into its own [`TopK`]; the partial
//! collectors are merged once all lengths are done. With
//! [`Config::parallel_query`] the lengths are spread over the rayon pool.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::buckets::{Buckets, LengthGroup};
use crate::distance::{bounded_distance_chars, chars, Chars};
use crate::histogram::{lower_bound32, lower_bound64, Fingerprint};
use crate::topk::{KeyScore, TopK};
use crate::Config;

/// Counters describing how much work the filters saved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Length groups visited.
    pub lengths: usize,
    /// Buckets rejected by the parity histogram.
    pub buckets_pruned: usize,
    /// Entries rejected by the extended histogram.
    pub entries_pruned: usize,
    /// Entries that reached the edit-distance computation.
    pub verified: usize,
    /// Entries within the threshold.
    pub matched: usize,
}

impl ScanStats {
    fn add(&mut self, other: &ScanStats) {
        self.lengths += other.lengths;
        self.buckets_pruned += other.buckets_pruned;
        self.entries_pruned += other.entries_pruned;
        self.verified += other.verified;
        self.matched += other.matched;
    }
}

/// Matches and counters from one or more scanned lengths.
struct Partial {
    top: TopK,
    stats: ScanStats,
}

impl Partial {
    fn new(max_results: usize) -> Self {
        Self {
            top: TopK::new(max_results),
            stats: ScanStats::default(),
        }
    }

    fn merge(mut self, other: Partial) -> Self {
        self.top.merge(other.top);
        self.stats.add(&other.stats);
        self
    }
}

/// A query string decoded and fingerprinted once, ready to be matched
/// against any number of length groups.
pub struct PreparedQuery<'q> {
    text: &'q str,
    chars: Chars,
    fingerprint: Fingerprint,
    threshold: usize,
    max_results: usize,
    extended_filter: bool,
}

impl<'q> PreparedQuery<'q> {
    /// Prepare `text` for a search within `threshold` keeping `max_results`.
    pub fn new(text: &'q str, threshold: usize, max_results: usize, config: &Config) -> Self {
        Self {
            text,
            chars: chars(text),
            fingerprint: Fingerprint::of(text),
            threshold,
            max_results,
            extended_filter: config.extended_filter,
        }
    }

    /// Key lengths that can hold a match.
    pub fn lengths(&self) -> std::ops::RangeInclusive<usize> {
        let len = self.fingerprint.len;
        len.saturating_sub(self.threshold)..=len.saturating_add(self.threshold)
    }

    /// Scan every key of one length.
    fn scan(&self, len: usize, group: &LengthGroup) -> Partial {
        let mut part = Partial::new(self.max_results);
        part.stats.lengths = 1;
        let length_diff = len.abs_diff(self.fingerprint.len);

        for (&histogram, bucket) in group {
            if lower_bound32(self.fingerprint.parity, histogram, length_diff) > self.threshold {
                part.stats.buckets_pruned += 1;
                continue;
            }
            for entry in bucket {
                if self.extended_filter
                    && lower_bound64(self.fingerprint.extended, entry.extended, length_diff)
                        > self.threshold
                {
                    part.stats.entries_pruned += 1;
                    continue;
                }

                part.stats.verified += 1;
                let key = chars(&entry.key);
                let Some(distance) = bounded_distance_chars(&self.chars, &key, self.threshold)
                else {
                    continue;
                };
                part.stats.matched += 1;

                let prefix = self
                    .chars
                    .iter()
                    .zip(key.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                if part.top.admits(prefix, distance, &entry.key) {
                    part.top.push(KeyScore {
                        prefix,
                        distance,
                        key: entry.key.clone(),
                    });
                }
            }
        }

        trace!(
            query = self.text,
            len,
            buckets = group.len(),
            pruned = part.stats.buckets_pruned,
            matched = part.stats.matched,
            "scanned length group"
        );
        part
    }

    /// Run the query against `buckets`, returning best-first scores and the
    /// scan counters.
    pub fn execute(&self, buckets: &Buckets, parallel: bool) -> (Vec<KeyScore>, ScanStats) {
        if self.max_results == 0 {
            return (Vec::new(), ScanStats::default());
        }

        let groups: Vec<(usize, &LengthGroup)> = buckets.groups_in(self.lengths()).collect();

        let result = if parallel && groups.len() > 1 {
            groups
                .par_iter()
                .map(|&(len, group)| self.scan(len, group))
                .reduce(|| Partial::new(self.max_results), Partial::merge)
        } else {
            groups
                .iter()
                .map(|&(len, group)| self.scan(len, group))
                .fold(Partial::new(self.max_results), Partial::merge)
        };

        debug!(
            query = self.text,
            threshold = self.threshold,
            max_results = self.max_results,
            lengths = result.stats.lengths,
            buckets_pruned = result.stats.buckets_pruned,
            entries_pruned = result.stats.entries_pruned,
            verified = result.stats.verified,
            matched = result.stats.matched,
            "fuzzy query"
        );
        (result.top.into_sorted_vec(), result.stats)
    }
}

/// Best-first keys of `buckets` within `threshold` of `query`, at most
/// `max_results` of them.
pub fn run(
    buckets: &Buckets,
    query: &str,
    threshold: usize,
    max_results: usize,
    config: &Config,
) -> Vec<String> {
    let (scores, _) =
        PreparedQuery::new(query, threshold, max_results, config).execute(buckets, config.parallel_query);
    scores.into_iter().map(|s| s.key).collect()
}
