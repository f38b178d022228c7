//! The deduplication pipeline: records in, collapsed clusters out.

use crate::cluster::build_clusters;
use crate::dto::{DedupConfig, DedupOutput, DedupResult, DedupStats, Record, SkippedRecord};
use crate::error::DedupError;
use crate::index::find_similar_pairs_with_stats;
use crate::select::select_representatives;
use crate::shingle::{shingle, ShingleSet};
use crate::tokenize::{LinguisticResources, Tokenizer};
use crate::util::timed;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{info, warn};

/// A validated configuration bound to its tokenizer.
#[derive(Clone, Debug)]
pub struct Deduplicator {
    config: DedupConfig,
    tokenizer: Tokenizer,
}

impl Deduplicator {
    /// Fails with `MissingResource` for linguistic mode; use [`Deduplicator::with_resources`].
    pub fn new(config: DedupConfig) -> Result<Self, DedupError> {
        Self::build(config, None)
    }

    pub fn with_resources(
        config: DedupConfig,
        resources: Arc<LinguisticResources>,
    ) -> Result<Self, DedupError> {
        Self::build(config, Some(resources))
    }

    fn build(
        config: DedupConfig,
        resources: Option<Arc<LinguisticResources>>,
    ) -> Result<Self, DedupError> {
        config.validate()?;
        let tokenizer = Tokenizer::new(config.tokenize_mode, resources)?;
        Ok(Deduplicator { config, tokenizer })
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Tokenizes and shingles one record. Errors here only affect that record.
    pub fn shingle_record(&self, record: &Record) -> Result<ShingleSet, DedupError> {
        if !record.criterion.is_finite() {
            return Err(DedupError::invalid_record(format!(
                "criterion value {} of record '{}' is not a finite number",
                record.criterion, record.id
            )));
        }
        let tokens = self.tokenizer.tokenize(&record.text)?;
        shingle(&tokens, self.config.shingle_length)
    }

    ///
    /// Collapses every near-duplicate cluster of `records` to one representative.
    ///
    /// Results list the clusters by descending size, then every record that matched
    /// nothing with a count of 1, in input order. Records that fail tokenization are
    /// reported in `skipped` and take no part in the comparison.
    ///
    pub fn deduplicate(&self, records: &[Record]) -> Result<DedupOutput, DedupError> {
        let processed: Vec<Result<ShingleSet, DedupError>> = timed("Shingled records", || {
            records
                .par_iter()
                .map(|record| self.shingle_record(record))
                .collect()
        });

        let mut sets = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let mut is_skipped = vec![false; records.len()];
        for (index, (record, result)) in records.iter().zip(processed).enumerate() {
            match result {
                Ok(set) => sets.push(set),
                Err(error) => {
                    warn!(index, id = %record.id, error = %error.msg, "Skipping record");
                    is_skipped[index] = true;
                    skipped.push(SkippedRecord {
                        index,
                        id: record.id.clone(),
                        error,
                    });
                    sets.push(ShingleSet::default());
                }
            }
        }

        let (pairs, join_stats) = timed("Joined shingle sets", || {
            find_similar_pairs_with_stats(&sets, self.config.metric, self.config.threshold)
        })?;
        let clusters = timed("Clustered similar pairs", || {
            build_clusters(&pairs, records.len())
        })?;
        let mut representatives = select_representatives(records, &clusters, self.config.criterion)?;
        representatives.sort_by(|a, b| b.cluster_size.cmp(&a.cluster_size));

        let mut results: Vec<DedupResult> = representatives
            .iter()
            .map(|rep| DedupResult {
                representative_index: rep.representative_index,
                representative_id: records[rep.representative_index].id.clone(),
                duplicate_count: rep.cluster_size,
            })
            .collect();
        results.extend(
            records
                .iter()
                .enumerate()
                .filter(|&(index, _)| !is_skipped[index] && clusters.cluster_of(index).is_none())
                .map(|(index, record)| DedupResult {
                    representative_index: index,
                    representative_id: record.id.clone(),
                    duplicate_count: 1,
                }),
        );

        let stats = DedupStats {
            records: records.len(),
            skipped: skipped.len(),
            empty_sets: join_stats.empty_sets - skipped.len(),
            probed_candidates: join_stats.probed_candidates,
            verified_candidates: join_stats.verified_candidates,
            pairs: pairs.len(),
            clusters: clusters.len(),
        };
        info!(
            records = stats.records,
            skipped = stats.skipped,
            pairs = stats.pairs,
            clusters = stats.clusters,
            output = results.len(),
            "Deduplication finished"
        );
        Ok(DedupOutput {
            results,
            skipped,
            stats,
        })
    }
}

/// Runs the pipeline once with `config`. Linguistic mode needs [`Deduplicator::with_resources`].
pub fn deduplicate(records: &[Record], config: &DedupConfig) -> Result<DedupOutput, DedupError> {
    Deduplicator::new(config.clone())?.deduplicate(records)
}
