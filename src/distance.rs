//! Levenshtein distance over Unicode scalar values.
//!
//! [`bounded_distance`] is the hot path of every fuzzy query: a banded
//! two-row dynamic program that only fills the cells within `threshold` of
//! the diagonal and gives up as soon as a whole row exceeds the threshold.
//! [`edit_distance`] is the plain full-matrix version.

use smallvec::SmallVec;

/// Inline capacity of the per-call char buffers. Keys longer than this spill
/// to the heap.
const INLINE_CHARS: usize = 32;

pub(crate) type Chars = SmallVec<[char; INLINE_CHARS]>;

#[inline]
pub(crate) fn chars(s: &str) -> Chars {
    s.chars().collect()
}

/// Classical Levenshtein distance (unit cost insert, delete, substitute).
pub fn edit_distance(source: &str, target: &str) -> usize {
    let source = chars(source);
    let target = chars(target);

    let mut prev: Vec<usize> = (0..=target.len()).collect();
    let mut curr = vec![0usize; target.len() + 1];

    for (i, &s) in source.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &t) in target.iter().enumerate() {
            let cost = usize::from(s != t);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[target.len()]
}

/// Levenshtein distance between `source` and `target` if it is at most
/// `threshold`, `None` otherwise.
pub fn bounded_distance(source: &str, target: &str, threshold: usize) -> Option<usize> {
    bounded_distance_chars(&chars(source), &chars(target), threshold)
}

/// [`bounded_distance`] over already-decoded char slices.
///
/// Queries decode the query string once and reuse it against every surviving
/// candidate.
pub fn bounded_distance_chars(source: &[char], target: &[char], threshold: usize) -> Option<usize> {
    // The shorter string drives the rows.
    let (short, long) = if source.len() <= target.len() {
        (source, target)
    } else {
        (target, source)
    };
    let (n, m) = (short.len(), long.len());

    if m - n > threshold {
        return None;
    }
    if n == 0 {
        return Some(m);
    }

    // No path is longer than `m`, so larger thresholds are equivalent to `m`.
    let k = threshold.min(m);
    // Stand-in for "outside the band"; every stored value is capped here.
    let inf = k + 1;

    let mut prev: Vec<usize> = (0..=m).map(|j| j.min(inf)).collect();
    let mut curr = vec![inf; m + 1];

    for i in 1..=n {
        let lo = i.saturating_sub(k).max(1);
        let hi = (i + k).min(m);

        // Column left of the band: real value at column 0, infinite otherwise.
        curr[lo - 1] = if lo == 1 { i.min(inf) } else { inf };
        let mut row_min = curr[lo - 1];

        let s = short[i - 1];
        for j in lo..=hi {
            let cost = usize::from(s != long[j - 1]);
            let value = (prev[j - 1] + cost)
                .min(prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(inf);
            curr[j] = value;
            row_min = row_min.min(value);
        }
        // The next row reads one column past this band.
        if hi < m {
            curr[hi + 1] = inf;
        }

        if row_min > k {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[m];
    (distance <= k).then_some(distance)
}

/// Number of leading chars `a` and `b` have in common.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}
