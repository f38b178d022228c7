// Agreement of the prefix-filtered join with exhaustive comparison, plus the
// symmetry and monotonicity properties of the similarity measures.

use near_dedup_service::{find_similar_pairs, shingle, similarity, Metric, ShingleSet};
use rand::prelude::*;
use rand::rngs::StdRng;

const THRESHOLDS: [f64; 4] = [0.1, 0.4, 0.7, 0.99];

fn random_corpus(seed: u64, n: usize) -> Vec<ShingleSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vocabulary: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
    let mut sets = Vec::with_capacity(n);
    for _ in 0..n {
        // Narrow vocabulary now and then so that real near-duplicates exist.
        let tokens: Vec<String> = if !sets.is_empty() && rng.gen_bool(0.4) {
            let len = rng.gen_range(2..10);
            let mut base: Vec<String> = (0..len)
                .map(|_| vocabulary[rng.gen_range(0..4)].clone())
                .collect();
            if rng.gen_bool(0.5) {
                let at = rng.gen_range(0..base.len());
                base[at] = vocabulary[rng.gen_range(0..vocabulary.len())].clone();
            }
            base
        } else {
            let len = rng.gen_range(0..12);
            (0..len)
                .map(|_| vocabulary[rng.gen_range(0..vocabulary.len())].clone())
                .collect()
        };
        sets.push(shingle(&tokens, rng.gen_range(1..3)).unwrap());
    }
    sets
}

fn brute_force(sets: &[ShingleSet], metric: Metric, threshold: f64) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            if similarity(&sets[i], &sets[j], metric) >= threshold {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn join(sets: &[ShingleSet], metric: Metric, threshold: f64) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = find_similar_pairs(sets, metric, threshold)
        .unwrap()
        .into_iter()
        .map(|p| (p.a, p.b))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[test]
fn filtered_join_matches_brute_force() {
    for seed in 0..20 {
        let sets = random_corpus(seed, 50);
        for metric in [Metric::Jaccard, Metric::Cosine] {
            for threshold in THRESHOLDS {
                assert_eq!(
                    join(&sets, metric, threshold),
                    brute_force(&sets, metric, threshold),
                    "seed {seed}, {metric:?}, threshold {threshold}"
                );
            }
        }
    }
}

#[test]
fn join_emits_each_pair_once_in_canonical_order() {
    let sets = random_corpus(7, 50);
    let pairs = find_similar_pairs(&sets, Metric::Jaccard, 0.4).unwrap();
    let mut keys: Vec<(usize, usize)> = pairs.iter().map(|p| (p.a, p.b)).collect();
    assert!(keys.iter().all(|(a, b)| a < b));
    let before = keys.len();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

#[test]
fn raising_threshold_never_adds_pairs() {
    let sets = random_corpus(99, 50);
    for metric in [Metric::Jaccard, Metric::Cosine] {
        let mut previous = usize::MAX;
        for threshold in [0.05, 0.1, 0.2, 0.4, 0.55, 0.7, 0.85, 0.99, 1.0] {
            let count = find_similar_pairs(&sets, metric, threshold).unwrap().len();
            assert!(count <= previous, "{metric:?}: {count} pairs at {threshold}");
            previous = count;
        }
    }
}

#[test]
fn similarity_is_symmetric_on_random_sets() {
    let sets = random_corpus(3, 30);
    for a in &sets {
        for b in &sets {
            for metric in [Metric::Jaccard, Metric::Cosine] {
                assert_eq!(similarity(a, b, metric), similarity(b, a, metric));
            }
        }
    }
}

#[test]
fn join_is_deterministic() {
    let sets = random_corpus(11, 50);
    let first = find_similar_pairs(&sets, Metric::Cosine, 0.4).unwrap();
    let second = find_similar_pairs(&sets, Metric::Cosine, 0.4).unwrap();
    assert_eq!(first, second);
}
