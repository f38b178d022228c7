use crate::error::DedupError;
use rustc_hash::FxHashSet;

/// Canonical shingles of one record: `n` consecutive tokens joined by a space.
pub type ShingleSet = FxHashSet<String>;

pub const SHINGLE_DELIMITER: &str = " ";

///
/// Builds the set of word n-grams of `tokens`.
///
/// Fewer than `n` tokens yield an empty set, which never matches anything.
///
pub fn shingle<S: AsRef<str>>(tokens: &[S], n: usize) -> Result<ShingleSet, DedupError> {
    if n == 0 {
        return Err(DedupError::invalid_shingle_length(
            "shingle length must be at least 1",
        ));
    }
    Ok(tokens
        .windows(n)
        .map(|window| {
            window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(SHINGLE_DELIMITER)
        })
        .collect())
}
