//! All-pairs similarity self-join with prefix and length filtering.

use crate::dto::CandidatePair;
use crate::error::DedupError;
use crate::shingle::ShingleSet;
use crate::similarity::{validate_threshold, Metric};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use tracing::debug;

/// Work counters of one join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Sets with no shingles, excluded from the join.
    pub empty_sets: usize,
    /// Distinct candidates reached through a shared prefix token.
    pub probed_candidates: usize,
    /// Candidates surviving the length filter, scored exactly.
    pub verified_candidates: usize,
    pub pairs: usize,
}

impl JoinStats {
    fn merge(mut self, other: JoinStats) -> JoinStats {
        self.empty_sets += other.empty_sets;
        self.probed_candidates += other.probed_candidates;
        self.verified_candidates += other.verified_candidates;
        self.pairs += other.pairs;
        self
    }
}

///
/// Inverted index over the prefixes of rank-encoded shingle sets.
///
/// Every shingle is replaced by its rank in a global ordering that puts the rarest
/// shingles first, so the prefix of each set holds its most selective elements.
/// The index is complete once constructed and only read while probing.
///
pub struct PrefixIndex {
    metric: Metric,
    threshold: f64,
    /// Rank vectors, ascending, indexed by record index.
    ranked: Vec<Vec<u32>>,
    /// Record indices of the non-empty sets, by size then record index.
    order: Vec<usize>,
    /// Rank to the positions in `order` whose prefix contains it, ascending.
    postings: Vec<Vec<u32>>,
}

impl PrefixIndex {
    ///
    /// Builds the index.
    ///
    /// ## Arguments
    ///
    /// * `sets` - One shingle set per record, in record order.
    /// * `metric` - Similarity measure the join will use.
    /// * `threshold` - Inclusive similarity threshold in `(0, 1]`.
    ///
    pub fn new(sets: &[ShingleSet], metric: Metric, threshold: f64) -> Result<Self, DedupError> {
        validate_threshold(threshold)?;

        let mut frequency: FxHashMap<&str, u32> = FxHashMap::default();
        for set in sets {
            for shingle in set {
                *frequency.entry(shingle.as_str()).or_insert(0) += 1;
            }
        }
        let mut by_rarity: Vec<(&str, u32)> = frequency.into_iter().collect();
        by_rarity.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        let rank: FxHashMap<&str, u32> = by_rarity
            .iter()
            .enumerate()
            .map(|(r, &(shingle, _))| (shingle, r as u32))
            .collect();

        let ranked: Vec<Vec<u32>> = sets
            .par_iter()
            .map(|set| {
                let mut ranks: Vec<u32> = set.iter().map(|s| rank[s.as_str()]).collect();
                ranks.sort_unstable();
                ranks
            })
            .collect();

        let mut order: Vec<usize> = (0..ranked.len()).filter(|&i| !ranked[i].is_empty()).collect();
        order.sort_by_key(|&i| ranked[i].len());

        let mut postings: Vec<Vec<u32>> = vec![Vec::new(); by_rarity.len()];
        for (pos, &i) in order.iter().enumerate() {
            let prefix = metric.prefix_len(ranked[i].len(), threshold);
            for &r in &ranked[i][..prefix] {
                postings[r as usize].push(pos as u32);
            }
        }

        Ok(PrefixIndex {
            metric,
            threshold,
            ranked,
            order,
            postings,
        })
    }

    pub fn num_sets(&self) -> usize {
        self.ranked.len()
    }

    ///
    /// Finds every set preceding the `pos`-th set (in size order) that is similar
    /// enough to it. Each unordered pair is therefore found by exactly one probe.
    ///
    pub fn query(&self, pos: usize) -> (Vec<CandidatePair>, JoinStats) {
        let mut stats = JoinStats::default();
        let mut pairs = Vec::new();
        let x = self.order[pos];
        let xs = &self.ranked[x];
        let min_len = self.metric.min_overlap(xs.len(), self.threshold);
        let prefix = self.metric.prefix_len(xs.len(), self.threshold);
        let mut seen: FxHashSet<u32> = FxHashSet::default();

        for &r in &xs[..prefix] {
            for &other in &self.postings[r as usize] {
                if other as usize >= pos {
                    break;
                }
                if !seen.insert(other) {
                    continue;
                }
                stats.probed_candidates += 1;
                let y = self.order[other as usize];
                let ys = &self.ranked[y];
                if ys.len() < min_len {
                    continue;
                }
                stats.verified_candidates += 1;
                let score = self
                    .metric
                    .score(intersection_size(xs, ys), xs.len(), ys.len());
                if score >= self.threshold {
                    pairs.push(CandidatePair::new(x, y, score));
                }
            }
        }
        stats.pairs = pairs.len();
        (pairs, stats)
    }

    /// Probes every set in parallel; output follows the size order of the probes.
    pub fn all_pairs(&self) -> (Vec<CandidatePair>, JoinStats) {
        let results: Vec<(Vec<CandidatePair>, JoinStats)> = (0..self.order.len())
            .into_par_iter()
            .map(|pos| self.query(pos))
            .collect();
        let initial = JoinStats {
            empty_sets: self.ranked.len() - self.order.len(),
            ..Default::default()
        };
        results
            .into_iter()
            .fold((Vec::new(), initial), |(mut pairs, stats), (found, s)| {
                pairs.extend(found);
                (pairs, stats.merge(s))
            })
    }
}

///
/// Returns every pair of `sets` whose similarity under `metric` is at least
/// `threshold`, each unordered pair once with the smaller index first.
///
pub fn find_similar_pairs(
    sets: &[ShingleSet],
    metric: Metric,
    threshold: f64,
) -> Result<Vec<CandidatePair>, DedupError> {
    find_similar_pairs_with_stats(sets, metric, threshold).map(|(pairs, _)| pairs)
}

pub fn find_similar_pairs_with_stats(
    sets: &[ShingleSet],
    metric: Metric,
    threshold: f64,
) -> Result<(Vec<CandidatePair>, JoinStats), DedupError> {
    let index = PrefixIndex::new(sets, metric, threshold)?;
    let (pairs, stats) = index.all_pairs();
    debug!(
        sets = index.num_sets(),
        empty = stats.empty_sets,
        probed = stats.probed_candidates,
        verified = stats.verified_candidates,
        pairs = stats.pairs,
        "All-pairs join finished"
    );
    Ok((pairs, stats))
}

#[inline]
fn intersection_size(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
