//! Bounded best-N collector for fuzzy matches.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate match, ranked by prefix similarity, then distance, then key.
///
/// The `Ord` impl sorts *better* matches first: a longer common prefix with
/// the query wins, then a smaller edit distance, then the lexicographically
/// smaller key. `a < b` therefore means "`a` ranks above `b`", and the
/// maximum of a set is its worst element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyScore {
    /// Length of the prefix shared with the query, in chars.
    pub prefix: usize,
    /// Edit distance to the query.
    pub distance: usize,
    /// The matched key.
    pub key: String,
}

impl Ord for KeyScore {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .prefix
            .cmp(&self.prefix)
            .then(self.distance.cmp(&other.distance))
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for KeyScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the best `capacity` [`KeyScore`]s pushed into it.
///
/// Backed by a max-heap whose root is the current worst candidate, so the
/// eviction after an over-capacity push is a single `pop`.
#[derive(Clone, Debug)]
pub struct TopK {
    capacity: usize,
    heap: BinaryHeap<KeyScore>,
}

impl TopK {
    /// Create an empty collector holding at most `capacity` matches.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            // capacity + 1: a push may overshoot by one before the eviction
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    /// Maximum number of matches retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of matches currently held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The worst retained match, i.e. the next one to be evicted.
    pub fn worst(&self) -> Option<&KeyScore> {
        self.heap.peek()
    }

    /// True if a match with these scores would survive a push.
    ///
    /// Lets callers skip building a `KeyScore` that is evicted right away.
    pub fn admits(&self, prefix: usize, distance: usize, key: &str) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            return true;
        }
        match self.heap.peek() {
            Some(worst) => ranks_above(prefix, distance, key, worst),
            None => true,
        }
    }

    /// Insert a match, evicting the worst one if over capacity.
    pub fn push(&mut self, score: KeyScore) {
        if self.capacity == 0 {
            return;
        }
        self.heap.push(score);
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Fold another collector into this one.
    pub fn merge(&mut self, other: TopK) {
        for score in other.heap {
            self.push(score);
        }
    }

    /// Drain into a best-first list of scores.
    pub fn into_sorted_vec(self) -> Vec<KeyScore> {
        // Popping yields worst-first; reversing that is the ascending order.
        let mut heap = self.heap;
        let mut out = Vec::with_capacity(heap.len());
        while let Some(score) = heap.pop() {
            out.push(score);
        }
        out.reverse();
        out
    }

    /// Drain into a best-first list of keys.
    pub fn into_keys(self) -> Vec<String> {
        self.into_sorted_vec().into_iter().map(|s| s.key).collect()
    }
}

/// True if the candidate `(prefix, distance, key)` ranks strictly above `worst`.
#[inline]
fn ranks_above(prefix: usize, distance: usize, key: &str, worst: &KeyScore) -> bool {
    worst
        .prefix
        .cmp(&prefix)
        .then(distance.cmp(&worst.distance))
        .then_with(|| key.cmp(worst.key.as_str()))
        == Ordering::Less
}
