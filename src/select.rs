use crate::cluster::DuplicateClusters;
use crate::dto::{Record, RepresentativeResult};
use crate::error::DedupError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Score used to pick the record that stands for its cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Criterion {
    /// The record's own criterion value (e.g. upvotes).
    Score,
    /// Text length in characters.
    Length,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Score => "score",
            Criterion::Length => "length",
        }
    }

    pub fn score(&self, record: &Record) -> f64 {
        match self {
            Criterion::Score => record.criterion,
            Criterion::Length => record.text.chars().count() as f64,
        }
    }
}

impl FromStr for Criterion {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "score" => Ok(Criterion::Score),
            "length" => Ok(Criterion::Length),
            _ => Err(DedupError::invalid_criterion(format!(
                "Expected score or length, got {s}"
            ))),
        }
    }
}

impl TryFrom<String> for Criterion {
    type Error = DedupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Criterion> for String {
    fn from(criterion: Criterion) -> Self {
        criterion.as_str().to_string()
    }
}

///
/// Picks one representative per cluster: the member with the strictly greatest
/// score, the first member in stored order on ties.
///
pub fn select_representatives(
    records: &[Record],
    clusters: &DuplicateClusters,
    criterion: Criterion,
) -> Result<Vec<RepresentativeResult>, DedupError> {
    clusters
        .iter()
        .map(|(key, members)| pick(records, key, members, criterion))
        .collect()
}

fn pick(
    records: &[Record],
    key: usize,
    members: &[usize],
    criterion: Criterion,
) -> Result<RepresentativeResult, DedupError> {
    let mut best: Option<(usize, f64)> = None;
    for &index in members {
        let record = records.get(index).ok_or_else(|| {
            DedupError::logic(format!(
                "cluster {key} refers to record {index} but only {} records exist",
                records.len()
            ))
        })?;
        let score = criterion.score(record);
        if !score.is_finite() {
            return Err(DedupError::invalid_record(format!(
                "record '{}' in cluster {key} has non-finite {} {score}",
                record.id,
                criterion.as_str()
            )));
        }
        match best {
            Some((_, max_score)) if score <= max_score => {}
            _ => best = Some((index, score)),
        }
    }
    let (representative_index, _) =
        best.ok_or_else(|| DedupError::logic(format!("cluster {key} has no members")))?;
    Ok(RepresentativeResult {
        representative_index,
        cluster_size: members.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::build_clusters;
    use crate::dto::CandidatePair;
    use crate::error::ErrorKind;

    fn records(scores: &[f64]) -> Vec<Record> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| Record::new(format!("r{i}"), "x".repeat(i + 1), s))
            .collect()
    }

    fn clusters(edges: &[(usize, usize)], n: usize) -> DuplicateClusters {
        let pairs: Vec<CandidatePair> = edges.iter().map(|&(a, b)| CandidatePair::new(a, b, 1.0)).collect();
        build_clusters(&pairs, n).unwrap()
    }

    #[test]
    fn highest_score_wins() {
        let recs = records(&[1.0, 9.0, 4.0]);
        let result = select_representatives(&recs, &clusters(&[(0, 1), (1, 2)], 3), Criterion::Score).unwrap();
        assert_eq!(
            result,
            vec![RepresentativeResult { representative_index: 1, cluster_size: 3 }]
        );
    }

    #[test]
    fn ties_go_to_first_member() {
        let recs = records(&[5.0, 5.0, 3.0]);
        let result = select_representatives(&recs, &clusters(&[(1, 2), (0, 2)], 3), Criterion::Score).unwrap();
        assert_eq!(result[0].representative_index, 0);
        assert_eq!(result[0].cluster_size, 3);
    }

    #[test]
    fn negative_scores_still_select() {
        let recs = records(&[-4.0, -2.0]);
        let result = select_representatives(&recs, &clusters(&[(0, 1)], 2), Criterion::Score).unwrap();
        assert_eq!(result[0].representative_index, 1);
    }

    #[test]
    fn non_finite_score_is_rejected() {
        for bad in [f64::NAN, f64::INFINITY] {
            let recs = records(&[5.0, bad]);
            let err = select_representatives(&recs, &clusters(&[(0, 1)], 2), Criterion::Score).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidRecord);
            assert!(err.msg.contains("r1"));
        }
    }

    #[test]
    fn length_criterion_prefers_longest_text() {
        let recs = records(&[100.0, 0.0, 0.0]);
        let result = select_representatives(&recs, &clusters(&[(0, 2)], 3), Criterion::Length).unwrap();
        assert_eq!(result[0].representative_index, 2);
    }

    #[test]
    fn one_result_per_cluster() {
        let recs = records(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let result = select_representatives(&recs, &clusters(&[(0, 1), (3, 4)], 5), Criterion::Score).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], RepresentativeResult { representative_index: 1, cluster_size: 2 });
        assert_eq!(result[1], RepresentativeResult { representative_index: 4, cluster_size: 2 });
    }

    #[test]
    fn member_outside_records_is_logic_error() {
        let recs = records(&[1.0, 2.0]);
        let err = select_representatives(&recs, &clusters(&[(0, 3)], 4), Criterion::Score).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Logic);
    }

    #[test]
    fn empty_member_list_is_logic_error() {
        let recs = records(&[1.0]);
        let err = pick(&recs, 0, &[], Criterion::Score).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Logic);
    }

    #[test]
    fn criterion_parsing() {
        assert_eq!("LENGTH".parse::<Criterion>().unwrap(), Criterion::Length);
        assert_eq!("upvotes".parse::<Criterion>().unwrap_err().kind, ErrorKind::InvalidCriterion);
    }
}
