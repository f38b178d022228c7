use crate::error::DedupError;
use crate::select::Criterion;
use crate::similarity::{validate_threshold, Metric};
use crate::tokenize::TokenizeMode;
use crate::util::get_env_var;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SHINGLE_LENGTH: usize = 3;
pub const DEFAULT_THRESHOLD: f64 = 0.4;

pub const THRESHOLD_ENV: &str = "DEDUP_THRESHOLD";
pub const SHINGLE_LENGTH_ENV: &str = "DEDUP_SHINGLE_LENGTH";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupConfig {
    pub tokenize_mode: TokenizeMode,
    pub shingle_length: usize,
    pub metric: Metric,
    pub threshold: f64,
    pub criterion: Criterion,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            tokenize_mode: TokenizeMode::Simple,
            shingle_length: DEFAULT_SHINGLE_LENGTH,
            metric: Metric::Jaccard,
            threshold: DEFAULT_THRESHOLD,
            criterion: Criterion::Score,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> Result<(), DedupError> {
        if self.shingle_length == 0 {
            return Err(DedupError::invalid_shingle_length(
                "shingle length must be at least 1",
            ));
        }
        validate_threshold(self.threshold)
    }

    ///
    /// Reads a JSON config. Unknown mode, metric or criterion names fail with their
    /// own kind; anything else unreadable is `InvalidConfig`.
    ///
    pub fn from_json(bytes: &[u8]) -> Result<Self, DedupError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|err| DedupError::invalid_config(format!("config is not valid JSON: {err}")))?;
        if let Some(mode) = value.get("tokenizeMode").and_then(Value::as_str) {
            mode.parse::<TokenizeMode>()?;
        }
        if let Some(metric) = value.get("metric").and_then(Value::as_str) {
            metric.parse::<Metric>()?;
        }
        if let Some(criterion) = value.get("criterion").and_then(Value::as_str) {
            criterion.parse::<Criterion>()?;
        }
        serde_json::from_value(value).map_err(|err| DedupError::invalid_config(format!("config: {err}")))
    }

    /// Applies `DEDUP_THRESHOLD` and `DEDUP_SHINGLE_LENGTH` when they are set.
    pub fn with_env_overrides(self) -> Result<Self, DedupError> {
        self.with_overrides(|name| get_env_var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, DedupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(THRESHOLD_ENV) {
            self.threshold = value.trim().parse().map_err(|_| {
                DedupError::invalid_threshold(format!("{THRESHOLD_ENV}={value} is not a number"))
            })?;
        }
        if let Some(value) = lookup(SHINGLE_LENGTH_ENV) {
            self.shingle_length = value.trim().parse().map_err(|_| {
                DedupError::invalid_shingle_length(format!(
                    "{SHINGLE_LENGTH_ENV}={value} is not a positive integer"
                ))
            })?;
        }
        Ok(self)
    }
}

/// One input row. Its position in the input sequence is its record index.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Record {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub criterion: f64,
}

impl Record {
    pub fn new(id: impl Into<String>, text: impl Into<String>, criterion: f64) -> Self {
        Record {
            id: id.into(),
            text: text.into(),
            criterion,
        }
    }
}

/// Two records whose similarity reached the threshold. Always `a < b`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CandidatePair {
    pub a: usize,
    pub b: usize,
    pub similarity: f64,
}

impl CandidatePair {
    pub fn new(x: usize, y: usize, similarity: f64) -> Self {
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        CandidatePair { a, b, similarity }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeResult {
    pub representative_index: usize,
    pub cluster_size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupResult {
    pub representative_index: usize,
    pub representative_id: String,
    pub duplicate_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub id: String,
    pub error: DedupError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub records: usize,
    pub skipped: usize,
    pub empty_sets: usize,
    pub probed_candidates: usize,
    pub verified_candidates: usize,
    pub pairs: usize,
    pub clusters: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DedupOutput {
    pub results: Vec<DedupResult>,
    pub skipped: Vec<SkippedRecord>,
    pub stats: DedupStats,
}
