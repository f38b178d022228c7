//! Set similarity measures and the bounds the prefix filter derives from them.

use crate::error::DedupError;
use crate::shingle::ShingleSet;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Absorbs float error in `t * len` so bounds never exceed the exact value.
const BOUND_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// `|A∩B| / |A∪B|`
    Jaccard,
    /// `|A∩B| / sqrt(|A|·|B|)`
    Cosine,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Jaccard => "jaccard",
            Metric::Cosine => "cosine",
        }
    }

    /// Similarity of two sets of the given sizes sharing `overlap` elements.
    #[inline]
    pub fn score(&self, overlap: usize, len_a: usize, len_b: usize) -> f64 {
        if len_a == 0 || len_b == 0 {
            return 0.0;
        }
        match self {
            Metric::Jaccard => overlap as f64 / (len_a + len_b - overlap) as f64,
            Metric::Cosine => overlap as f64 / ((len_a * len_b) as f64).sqrt(),
        }
    }

    ///
    /// Smallest overlap a set of size `len` must share with any set that is no
    /// larger than it for the pair to reach `threshold`. The same value bounds the
    /// size of such a partner from below.
    ///
    #[inline]
    pub fn min_overlap(&self, len: usize, threshold: f64) -> usize {
        let factor = match self {
            Metric::Jaccard => threshold,
            Metric::Cosine => threshold * threshold,
        };
        ((factor * len as f64 - BOUND_EPSILON).ceil() as usize).max(1)
    }

    /// Number of leading (rarest) elements of a set that must be indexed and probed.
    #[inline]
    pub fn prefix_len(&self, len: usize, threshold: f64) -> usize {
        if len == 0 {
            return 0;
        }
        len - self.min_overlap(len, threshold).min(len) + 1
    }
}

impl FromStr for Metric {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jaccard" => Ok(Metric::Jaccard),
            "cosine" => Ok(Metric::Cosine),
            _ => Err(DedupError::invalid_metric(format!(
                "Expected jaccard or cosine, got {s}"
            ))),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = DedupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), DedupError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(DedupError::invalid_threshold(format!(
            "threshold must be in (0, 1], got {threshold}"
        )))
    }
}

/// Similarity of two shingle sets. Empty sets score 0 against everything.
pub fn similarity(a: &ShingleSet, b: &ShingleSet, metric: Metric) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let overlap = small.iter().filter(|s| large.contains(*s)).count();
    metric.score(overlap, a.len(), b.len())
}
