//! Near-duplicate detection for text corpora.
//!
//! Records are tokenized, shingled into word n-grams, joined against each other
//! with a prefix-filtered all-pairs similarity search, grouped into connected
//! components and collapsed to one representative per group.

pub mod cluster;
pub mod dedup;
pub mod dto;
pub mod error;
pub mod index;
pub mod response;
pub mod select;
pub mod shingle;
pub mod similarity;
pub mod tokenize;
pub mod util;

pub use cluster::{build_clusters, DuplicateClusters};
pub use dedup::{deduplicate, Deduplicator};
pub use dto::{CandidatePair, DedupConfig, DedupOutput, DedupResult, Record, RepresentativeResult};
pub use error::{DedupError, ErrorKind};
pub use index::{find_similar_pairs, PrefixIndex};
pub use select::{select_representatives, Criterion};
pub use shingle::{shingle, ShingleSet};
pub use similarity::{similarity, Metric};
pub use tokenize::{tokenize, LinguisticResources, Lemmatizer, SuffixLemmatizer, TokenizeMode, Tokenizer};
