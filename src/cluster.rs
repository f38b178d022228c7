use crate::dto::CandidatePair;
use crate::error::DedupError;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

///
/// Connected components of the graph whose edges are candidate pairs.
///
/// Only records mentioned by at least one pair are present; every other record is
/// an implicit singleton. Members of a cluster are kept in ascending record order
/// and clusters are keyed by their smallest member.
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateClusters {
    /// Mapping of cluster key to member record indices
    duplicate_groups: BTreeMap<usize, Vec<usize>>,
    /// Reverse lookup to identify the cluster key of a record index
    doc_lookup: FxHashMap<usize, usize>,
}

impl DuplicateClusters {
    ///
    /// Groups the records connected by `pairs`.
    ///
    /// ## Arguments
    ///
    /// * `pairs` - Similar record pairs, in any order, possibly repeated.
    /// * `num_records` - Size of the corpus the pairs index into.
    ///
    pub fn new(pairs: &[CandidatePair], num_records: usize) -> Result<Self, DedupError> {
        let mut forest = DisjointSet::default();
        for pair in pairs {
            for index in [pair.a, pair.b] {
                if index >= num_records {
                    return Err(DedupError::invalid_record_index(format!(
                        "record index {index} out of range for {num_records} records"
                    )));
                }
            }
            if pair.a == pair.b {
                return Err(DedupError::invalid_record_index(format!(
                    "record {} paired with itself",
                    pair.a
                )));
            }
            forest.union(pair.a, pair.b);
        }
        Ok(Self::from_forest(forest))
    }

    pub fn grouped_ids(&self) -> Vec<&[usize]> {
        self.duplicate_groups.values().map(Vec::as_slice).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.duplicate_groups
            .iter()
            .map(|(&key, members)| (key, members.as_slice()))
    }

    pub fn cluster_of(&self, index: usize) -> Option<usize> {
        self.doc_lookup.get(&index).copied()
    }

    pub fn members(&self, key: usize) -> Option<&[usize]> {
        self.duplicate_groups.get(&key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.duplicate_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duplicate_groups.is_empty()
    }

    fn from_forest(mut forest: DisjointSet) -> Self {
        let mut vertices: Vec<usize> = forest.slot.keys().copied().collect();
        vertices.sort_unstable();
        let mut by_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut clusters = Self::default();
        // Ascending visit order makes each root's first vertex its smallest member.
        for vertex in vertices {
            let root = forest.find(vertex);
            let key = *by_root.entry(root).or_insert(vertex);
            clusters.add(key, vertex);
        }
        clusters
    }

    fn add(&mut self, key: usize, index: usize) {
        self.duplicate_groups.entry(key).or_default().push(index);
        self.doc_lookup.insert(index, key);
    }
}

/// Convenience wrapper over [`DuplicateClusters::new`].
pub fn build_clusters(
    pairs: &[CandidatePair],
    num_records: usize,
) -> Result<DuplicateClusters, DedupError> {
    DuplicateClusters::new(pairs, num_records)
}

/// Union-find over sparse record indices, without recursion.
#[derive(Default)]
struct DisjointSet {
    /// Record index to its dense slot.
    slot: FxHashMap<usize, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn slot_of(&mut self, index: usize) -> usize {
        let next = self.parent.len();
        let slot = *self.slot.entry(index).or_insert(next);
        if slot == next {
            self.parent.push(slot);
            self.rank.push(0);
        }
        slot
    }

    fn root(&mut self, mut slot: usize) -> usize {
        while self.parent[slot] != slot {
            // path halving
            self.parent[slot] = self.parent[self.parent[slot]];
            slot = self.parent[slot];
        }
        slot
    }

    fn find(&mut self, index: usize) -> usize {
        let slot = self.slot_of(index);
        self.root(slot)
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn pairs(edges: &[(usize, usize)]) -> Vec<CandidatePair> {
        edges
            .iter()
            .map(|&(a, b)| CandidatePair::new(a, b, 1.0))
            .collect()
    }

    #[test]
    fn transitive_edges_merge() {
        let clusters = build_clusters(&pairs(&[(0, 1), (1, 4), (5, 7)]), 8).unwrap();
        assert_eq!(clusters.grouped_ids(), vec![&[0, 1, 4][..], &[5, 7][..]]);
        assert_eq!(clusters.cluster_of(4), Some(0));
        assert_eq!(clusters.cluster_of(7), Some(5));
        assert_eq!(clusters.cluster_of(2), None);
    }

    #[test]
    fn unmentioned_records_are_absent() {
        let clusters = build_clusters(&pairs(&[(2, 3)]), 10).unwrap();
        assert_eq!(clusters.len(), 1);
        let total: usize = clusters.grouped_ids().iter().map(|g| g.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn empty_input() {
        let clusters = build_clusters(&[], 0).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn partition_independent_of_edge_order() {
        let edges = [(3, 9), (0, 2), (2, 3), (6, 8), (1, 6), (4, 5)];
        let forward = build_clusters(&pairs(&edges), 10).unwrap();
        let mut reversed = edges.to_vec();
        reversed.reverse();
        let backward = build_clusters(&pairs(&reversed), 10).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.members(0), Some(&[0, 2, 3, 9][..]));
    }

    #[test]
    fn every_index_in_at_most_one_cluster() {
        let edges: Vec<(usize, usize)> = (0..40).map(|i| (i % 13, (i * 7 + 3) % 29)).filter(|(a, b)| a != b).collect();
        let clusters = build_clusters(&pairs(&edges), 29).unwrap();
        let mut seen = std::collections::HashSet::new();
        for group in clusters.grouped_ids() {
            for &index in group {
                assert!(seen.insert(index), "{index} appears twice");
            }
        }
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let n = 200_000;
        let edges: Vec<CandidatePair> = (0..n - 1).map(|i| CandidatePair::new(i, i + 1, 1.0)).collect();
        let clusters = build_clusters(&edges, n).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters.members(0).map(|m| m.len()), Some(n));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let err = build_clusters(&pairs(&[(0, 5)]), 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordIndex);
    }

    #[test]
    fn self_pair_rejected() {
        let pair = CandidatePair { a: 3, b: 3, similarity: 1.0 };
        let err = build_clusters(&[pair], 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecordIndex);
    }
}
