//! Character histograms and the edit-distance lower bounds derived from them.
//!
//! Two fingerprints are kept per key:
//!
//! - a 32-bit parity histogram: bit `c mod 32` is toggled for every char `c`.
//!   Cheap to compute and to compare (one XOR + popcount), used to reject
//!   whole buckets of keys at once.
//! - a 64-bit extended histogram: 32 saturating 2-bit counters, indexed by
//!   `c mod 32`. Tighter than the parity histogram, used per entry.
//!
//! Both bounds are sound: a single insertion or deletion changes at most one
//! bit/counter by one, a substitution at most two, so
//! `(histogram difference + length difference) / 2` never exceeds the true
//! Levenshtein distance.

// =============================================================================
// 32-bit parity histogram
// =============================================================================

const HISTOGRAM_MASK: u32 = 31;

/// Computes the 32-bit parity histogram of `s`.
///
/// Permutation invariant; two chars landing on the same bit cancel out.
#[inline]
pub fn histogram32(s: &str) -> u32 {
    s.chars()
        .fold(0u32, |acc, c| acc ^ (1u32 << (c as u32 & HISTOGRAM_MASK)))
}

/// Lower bound on the edit distance of two strings from their parity
/// histograms and length difference.
#[inline]
pub fn lower_bound32(a: u32, b: u32, length_diff: usize) -> usize {
    ((a ^ b).count_ones() as usize + length_diff) >> 1
}

// =============================================================================
// 64-bit extended histogram
// =============================================================================

/// Bits per extended-histogram counter.
pub const BUCKET_BITS: u32 = 2;

/// Number of counters packed into the extended histogram.
pub const BUCKETS: u32 = 64 / BUCKET_BITS;

/// Saturation value of a single counter.
const BUCKET_MAX: u64 = (1 << BUCKET_BITS) - 1;

/// Computes the 64-bit extended histogram of `s`.
///
/// Counter `c mod 32` is incremented for every char `c` and saturates at 3.
pub fn histogram64(s: &str) -> u64 {
    let mut result = 0u64;
    for c in s.chars() {
        let shift = (c as u32 % BUCKETS) * BUCKET_BITS;
        if (result >> shift) & BUCKET_MAX != BUCKET_MAX {
            result += 1 << shift;
        }
    }
    result
}

/// Lower bound on the edit distance of two strings from their extended
/// histograms and length difference.
pub fn lower_bound64(mut a: u64, mut b: u64, length_diff: usize) -> usize {
    let mut total = length_diff;
    for _ in 0..BUCKETS {
        let ca = (a & BUCKET_MAX) as usize;
        let cb = (b & BUCKET_MAX) as usize;
        total += ca.abs_diff(cb);
        a >>= BUCKET_BITS;
        b >>= BUCKET_BITS;
    }
    total >> 1
}

/// Both fingerprints of one string, computed in a single call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    /// Char count.
    pub len: usize,
    /// Parity histogram.
    pub parity: u32,
    /// Extended histogram.
    pub extended: u64,
}

impl Fingerprint {
    /// Fingerprints `s`.
    pub fn of(s: &str) -> Self {
        Self {
            len: s.chars().count(),
            parity: histogram32(s),
            extended: histogram64(s),
        }
    }
}
