//! Text normalization: raw record text to a deterministic token sequence.

use crate::error::DedupError;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use stop_words::{get, LANGUAGE};

lazy_static! {
    // Runs left over once punctuation and non-ASCII characters are removed
    static ref WORD: Regex = Regex::new(r"[a-z0-9]+").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TokenizeMode {
    /// Lower-cased alphanumeric words, punctuation and non-ASCII stripped.
    Simple,
    /// `Simple`, then stop-word removal, lemmatization and dropping 1-letter words.
    Linguistic,
}

impl TokenizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenizeMode::Simple => "simple",
            TokenizeMode::Linguistic => "linguistic",
        }
    }
}

impl FromStr for TokenizeMode {
    type Err = DedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(TokenizeMode::Simple),
            "linguistic" | "normal" => Ok(TokenizeMode::Linguistic),
            _ => Err(DedupError::unsupported_mode(format!(
                "Expected simple or linguistic, got {s}"
            ))),
        }
    }
}

impl TryFrom<String> for TokenizeMode {
    type Error = DedupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenizeMode> for String {
    fn from(mode: TokenizeMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Reduces a token to its base form.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, word: &str) -> Result<String, DedupError>;
}

///
/// Rule-based English noun lemmatizer modelled on WordNet's detachment rules.
///
/// Without a dictionary to confirm the result, words of three letters or less and
/// words ending in `ss`, `us` or `is` are left alone.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct SuffixLemmatizer;

impl Lemmatizer for SuffixLemmatizer {
    fn lemmatize(&self, word: &str) -> Result<String, DedupError> {
        if word.len() <= 3 {
            return Ok(word.to_string());
        }
        let lemma = if let Some(stem) = word.strip_suffix("ies") {
            format!("{stem}y")
        } else if ["ches", "shes", "sses", "xes", "zes"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
        {
            word[..word.len() - 2].to_string()
        } else if let Some(stem) = word.strip_suffix("men") {
            format!("{stem}man")
        } else if word.ends_with('s') && !["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
            word[..word.len() - 1].to_string()
        } else {
            word.to_string()
        };
        Ok(lemma)
    }
}

/// Stop-word set and lemmatizer used by [`TokenizeMode::Linguistic`]. Loaded once,
/// read-only afterwards.
pub struct LinguisticResources {
    stop_words: FxHashSet<String>,
    lemmatizer: Box<dyn Lemmatizer>,
}

impl LinguisticResources {
    pub fn new<I, S, L>(stop_words: I, lemmatizer: L) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        L: Lemmatizer + 'static,
    {
        LinguisticResources {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            lemmatizer: Box::new(lemmatizer),
        }
    }

    /// English stop words from the `stop-words` crate with the suffix lemmatizer.
    pub fn english() -> Self {
        let stop_words: Vec<String> = get(LANGUAGE::English);
        Self::new(stop_words, SuffixLemmatizer)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn lemmatize(&self, word: &str) -> Result<String, DedupError> {
        self.lemmatizer.lemmatize(word)
    }
}

impl fmt::Debug for LinguisticResources {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LinguisticResources")
            .field("stop_words", &self.stop_words.len())
            .finish_non_exhaustive()
    }
}

/// Lower-cased alphanumeric words of `text` with punctuation and non-ASCII removed.
pub fn simple_tokens(text: &str) -> Vec<String> {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_punctuation())
        .collect::<String>()
        .to_ascii_lowercase();
    WORD.find_iter(&stripped)
        .map(|m| m.as_str().to_string())
        .collect()
}

///
/// Tokenizes `text` according to `mode`.
///
/// ## Arguments
///
/// * `text` - The raw record text.
/// * `mode` - Normalization to apply.
/// * `resources` - Required for [`TokenizeMode::Linguistic`], ignored otherwise.
///
pub fn tokenize(
    text: &str,
    mode: TokenizeMode,
    resources: Option<&LinguisticResources>,
) -> Result<Vec<String>, DedupError> {
    let words = simple_tokens(text);
    match mode {
        TokenizeMode::Simple => Ok(words),
        TokenizeMode::Linguistic => {
            let resources = resources.ok_or_else(|| {
                DedupError::missing_resource("linguistic tokenization requires stop words and a lemmatizer")
            })?;
            let mut tokens = Vec::with_capacity(words.len());
            for word in words.iter().filter(|w| !resources.is_stop_word(w)) {
                let lemma = resources.lemmatize(word)?;
                if lemma.chars().count() > 1 {
                    tokens.push(lemma);
                }
            }
            Ok(tokens)
        }
    }
}

/// A [`tokenize`] call bound to its mode and resources.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    mode: TokenizeMode,
    resources: Option<Arc<LinguisticResources>>,
}

impl Tokenizer {
    pub fn new(
        mode: TokenizeMode,
        resources: Option<Arc<LinguisticResources>>,
    ) -> Result<Self, DedupError> {
        if mode == TokenizeMode::Linguistic && resources.is_none() {
            return Err(DedupError::missing_resource(
                "linguistic tokenization requires stop words and a lemmatizer",
            ));
        }
        Ok(Tokenizer { mode, resources })
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<String>, DedupError> {
        tokenize(text, self.mode, self.resources.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn resources() -> LinguisticResources {
        LinguisticResources::new(["the", "on", "a", "is"], SuffixLemmatizer)
    }

    #[test]
    fn simple_strips_punctuation_and_non_ascii() {
        let tokens = simple_tokens("Don't PANIC!! Café—time\nnew_line 42");
        assert_eq!(tokens, vec!["dont", "panic", "caftime", "newline", "42"]);
    }

    #[test]
    fn simple_empty_text() {
        assert!(simple_tokens("").is_empty());
        assert!(simple_tokens("?!... —").is_empty());
    }

    #[test]
    fn linguistic_removes_stop_words_and_lemmatizes() {
        let res = resources();
        let tokens = tokenize("The cats sat on a mat", TokenizeMode::Linguistic, Some(&res)).unwrap();
        assert_eq!(tokens, vec!["cat", "sat", "mat"]);
    }

    #[test]
    fn linguistic_drops_single_letters() {
        let res = resources();
        let tokens = tokenize("x marks b spot", TokenizeMode::Linguistic, Some(&res)).unwrap();
        assert_eq!(tokens, vec!["mark", "spot"]);
    }

    #[test]
    fn linguistic_without_resources_fails() {
        let err = tokenize("hello", TokenizeMode::Linguistic, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingResource);
        let err = Tokenizer::new(TokenizeMode::Linguistic, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingResource);
    }

    #[test]
    fn tokenize_is_deterministic() {
        let tokenizer = Tokenizer::new(TokenizeMode::Linguistic, Some(Arc::new(resources()))).unwrap();
        let text = "Parties and boxes, churches and women!";
        assert_eq!(tokenizer.tokenize(text).unwrap(), tokenizer.tokenize(text).unwrap());
    }

    #[test]
    fn suffix_rules() {
        let l = SuffixLemmatizer;
        let cases = [
            ("parties", "party"),
            ("churches", "church"),
            ("boxes", "box"),
            ("classes", "class"),
            ("women", "woman"),
            ("jokes", "joke"),
            ("glass", "glass"),
            ("bonus", "bonus"),
            ("analysis", "analysis"),
            ("was", "was"),
        ];
        for (word, lemma) in cases {
            assert_eq!(l.lemmatize(word).unwrap(), lemma, "{word}");
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("SIMPLE".parse::<TokenizeMode>().unwrap(), TokenizeMode::Simple);
        assert_eq!("normal".parse::<TokenizeMode>().unwrap(), TokenizeMode::Linguistic);
        let err = "okt".parse::<TokenizeMode>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedMode);
    }

    #[test]
    fn english_resources_know_common_stop_words() {
        let res = LinguisticResources::english();
        assert!(res.is_stop_word("the"));
        assert!(!res.is_stop_word("shingle"));
    }
}
