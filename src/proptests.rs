use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

pub(crate) fn validate_index(index: &FuzzyIndex) {
    let stats = index.stats();
    let len = index.len();
    let inner = index.inner.read();
    assert_eq!(stats.keys, len, "stats must track live key count");
    assert_eq!(inner.entries().count(), len, "entry count must match len");
    assert!(stats.buckets <= stats.keys);
    assert!(stats.lengths <= stats.buckets);
    for entry in inner.entries() {
        assert_eq!(entry.extended, histogram64(&entry.key));
    }
}

/// Brute-force reference: score every key, sort best-first, truncate.
fn brute_force(keys: &[String], query: &str, threshold: usize, max_results: usize) -> Vec<String> {
    let mut scores: Vec<KeyScore> = keys
        .iter()
        .filter_map(|k| {
            let d = edit_distance(query, k);
            (d <= threshold).then(|| KeyScore {
                prefix: common_prefix_len(k, query),
                distance: d,
                key: k.clone(),
            })
        })
        .collect();
    scores.sort();
    scores.truncate(max_results);
    scores.into_iter().map(|s| s.key).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Set(String, String),
    Delete(String),
    Get(String),
}

fn small_key() -> impl Strategy<Value = String> + Clone {
    // A narrow alphabet makes collisions, shared buckets and near matches common.
    "[abcd]{0,6}"
}

fn any_text() -> impl Strategy<Value = String> + Clone {
    // Mixed ASCII and multi-byte chars, including ones sharing `c mod 32`.
    "[a-eA-Eăîșț日本 ]{0,10}"
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = small_key();
    let op = prop_oneof![
        50 => (key.clone(), "[0-9]{1,3}").prop_map(|(k, v)| Op::Set(k, v)),
        25 => key.clone().prop_map(Op::Delete),
        25 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_bounded_matches_unbounded(a in any_text(), b in any_text()) {
        let d = edit_distance(&a, &b);
        prop_assert_eq!(bounded_distance(&a, &b, usize::MAX), Some(d));
        prop_assert_eq!(bounded_distance(&a, &b, 64), Some(d));
        prop_assert_eq!(edit_distance(&b, &a), d);
    }

    #[test]
    fn prop_threshold_soundness(a in any_text(), b in any_text(), t in 0usize..6) {
        let d = edit_distance(&a, &b);
        let expected = if d <= t { Some(d) } else { None };
        prop_assert_eq!(bounded_distance(&a, &b, t), expected);
    }

    #[test]
    fn prop_lower_bounds_are_sound(a in any_text(), b in any_text()) {
        let d = edit_distance(&a, &b);
        let diff = a.chars().count().abs_diff(b.chars().count());
        prop_assert!(lower_bound32(histogram32(&a), histogram32(&b), diff) <= d);
        prop_assert!(lower_bound64(histogram64(&a), histogram64(&b), diff) <= d);
    }

    #[test]
    fn prop_histograms_permutation_invariant(s in any_text(), seed in any::<u64>()) {
        let mut chars: Vec<char> = s.chars().collect();
        // deterministic shuffle driven by the seed
        let mut state = seed | 1;
        for i in (1..chars.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            chars.swap(i, (state % (i as u64 + 1)) as usize);
        }
        let shuffled: String = chars.into_iter().collect();
        prop_assert_eq!(histogram32(&s), histogram32(&shuffled));
        prop_assert_eq!(histogram64(&s), histogram64(&shuffled));
        // parity: popcount never exceeds the char count and shares its parity
        let ones = histogram32(&s).count_ones() as usize;
        let n = s.chars().count();
        prop_assert!(ones <= n);
        prop_assert_eq!(ones % 2, n % 2);
    }

    #[test]
    fn prop_equivalence_with_btreemap(ops in ops_strategy()) {
        let index = FuzzyIndex::new();
        let mut m: BTreeMap<String, String> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(key, value) => {
                    let old_i = index.set(&key, value.clone());
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_i, old_m);
                }
                Op::Delete(key) => {
                    prop_assert_eq!(index.delete(&key), m.remove(&key).is_some());
                }
                Op::Get(key) => {
                    prop_assert_eq!(index.get(&key), m.get(&key).cloned());
                }
            }
            prop_assert_eq!(index.len(), m.len());
        }

        validate_index(&index);
    }

    #[test]
    fn prop_query_matches_brute_force(
        keys in prop::collection::btree_set(small_key(), 0..60),
        query in small_key(),
        threshold in 0usize..4,
        max_results in 0usize..8,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let index = FuzzyIndex::new();
        for k in &keys {
            index.set(k, "v");
        }
        let expected = brute_force(&keys, &query, threshold, max_results);
        prop_assert_eq!(index.query(&query, threshold, max_results), expected.clone());

        let sequential = FuzzyIndex::with_config(Config {
            parallel_query: false,
            extended_filter: true,
        });
        sequential.set_many(keys.iter().map(|k| (k, "v")));
        prop_assert_eq!(sequential.query(&query, threshold, max_results), expected);
    }

    #[test]
    fn prop_query_unicode_matches_brute_force(
        keys in prop::collection::btree_set(any_text(), 0..40),
        query in any_text(),
        threshold in 0usize..4,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let index = FuzzyIndex::new();
        index.set_many(keys.iter().map(|k| (k, "")));
        prop_assert_eq!(
            index.query(&query, threshold, 10),
            brute_force(&keys, &query, threshold, 10)
        );
    }
}

#[test]
fn exhaustive_small_alphabet_lower_bounds() {
    // every string over {a, b} up to length 4, against every other
    let mut all = vec![String::new()];
    let mut frontier = vec![String::new()];
    for _ in 0..4 {
        let mut next = Vec::new();
        for s in &frontier {
            for c in ['a', 'b'] {
                let mut t = s.clone();
                t.push(c);
                next.push(t);
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
    }

    for a in &all {
        for b in &all {
            let d = edit_distance(a, b);
            let diff = a.len().abs_diff(b.len());
            assert!(lower_bound32(histogram32(a), histogram32(b), diff) <= d, "{a:?} {b:?}");
            assert!(lower_bound64(histogram64(a), histogram64(b), diff) <= d, "{a:?} {b:?}");
            for t in 0..=4 {
                assert_eq!(bounded_distance(a, b, t), (d <= t).then_some(d), "{a:?} {b:?} {t}");
            }
        }
    }
}

#[test]
fn exhaustive_delete_order_small_set() {
    let keys = ["a", "b", "ab", "ba", "abc", "cab", "bca"];

    // rotate the delete order through every starting point, both directions
    for start in 0..keys.len() {
        for reverse in [false, true] {
            let index = FuzzyIndex::new();
            index.set_many(keys.iter().enumerate().map(|(i, k)| (*k, i.to_string())));
            let mut order: Vec<&str> = keys.iter().cycle().skip(start).take(keys.len()).copied().collect();
            if reverse {
                order.reverse();
            }
            for (n, k) in order.iter().enumerate() {
                assert!(index.delete(k));
                assert_eq!(index.len(), keys.len() - n - 1);
                validate_index(&index);
            }
            assert_eq!(index.stats(), IndexStats::default());
        }
    }
}
