//! Shared text primitives: splitting, word normalization, and sentence similarity.
//!
//! All length checks in the pipeline are character counts, not byte counts; the
//! service handles Cyrillic text where the two differ everywhere.

use std::collections::HashSet;

/// Number of characters in a string (Unicode scalar values).
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `chars`-th character, or the string length past the end.
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

/// Split into sentences on terminal punctuation, dropping empty pieces.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Split into blank-line-delimited paragraphs, dropping empty blocks.
pub(crate) fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Append a period unless the string already ends in terminal punctuation.
pub(crate) fn ensure_terminal(text: &str) -> String {
    if text.is_empty() || text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// Lowercased words with surrounding punctuation stripped.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Reduces words to a comparison form for dedup and consensus checks.
///
/// The production implementation is a crude prefix stemmer; the trait exists so
/// a real morphological stemmer can replace it without touching the filters.
pub trait WordNormalizer: Send + Sync {
    /// Reduce a single word to its comparison form.
    fn normalize(&self, word: &str) -> String;
}

/// Normalizer that truncates lowercased words to a fixed-length prefix.
///
/// Good enough to make Russian inflections of the same stem compare equal most
/// of the time; it is not lemmatization.
#[derive(Debug, Clone)]
pub struct PrefixStemmer {
    prefix_chars: usize,
}

impl PrefixStemmer {
    /// Build a stemmer keeping the first `prefix_chars` characters of each word.
    pub fn new(prefix_chars: usize) -> Self {
        Self { prefix_chars }
    }
}

impl Default for PrefixStemmer {
    fn default() -> Self {
        Self::new(6)
    }
}

impl WordNormalizer for PrefixStemmer {
    fn normalize(&self, word: &str) -> String {
        word.to_lowercase().chars().take(self.prefix_chars).collect()
    }
}

/// Tokenize and normalize every word of `text`.
pub(crate) fn normalized_words(text: &str, normalizer: &dyn WordNormalizer) -> Vec<String> {
    tokenize(text)
        .iter()
        .map(|word| normalizer.normalize(word))
        .collect()
}

/// Similarity between two sentences given as normalized word sequences.
///
/// Word-bigram overlap `|shared| / max(|A|, |B|)`; falls back to unigram
/// Jaccard when either side is too short to form a bigram.
pub(crate) fn bigram_overlap(a: &[String], b: &[String]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
        let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
        let union = set_a.union(&set_b).count();
        if union == 0 {
            return 0.0;
        }
        return set_a.intersection(&set_b).count() as f64 / union as f64;
    }

    fn bigrams(words: &[String]) -> HashSet<(&str, &str)> {
        words
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
            .collect()
    }
    let set_a = bigrams(a);
    let set_b = bigrams(b);
    let shared = set_a.intersection(&set_b).count();
    shared as f64 / set_a.len().max(set_b.len()) as f64
}

/// Fraction of `a`'s words that also occur in `b`; 0.0 when `a` is empty.
pub(crate) fn subset_fraction(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.intersection(b).count() as f64 / a.len() as f64
}
