//! Rare-sentence filter: suppression of poorly attested (likely hallucinated)
//! summary content.
//!
//! Abstractive generation sometimes invents facts that no source review
//! mentions. A summary sentence whose content words are barely attested across
//! the source paragraphs is dropped, unless doing so would gut the summary.

use super::text::{
    WordNormalizer, char_len, ensure_terminal, normalized_words, split_sentences,
};
use std::collections::HashSet;

const MIN_SUPPORT: usize = 2;
const MIN_CONTENT_WORD_CHARS: usize = 5;
const MAX_RARE_FRACTION: f64 = 0.55;
const FEW_CONTENT_WORDS: usize = 4;
const KEEP_MIN_CHARS: usize = 220;
const KEEP_MIN_SENTENCES: usize = 4;

/// Drop summary sentences whose vocabulary is rare across source paragraphs.
///
/// Only meaningful for documents assembled from at least three reviews; with
/// fewer paragraphs the summary is returned untouched. The filtered result is
/// also discarded (in favor of the input) when it falls under 220 characters
/// or 4 sentences, so aggressive filtering cannot destroy the summary.
pub(crate) fn filter_rare_sentences(
    summary: &str,
    paragraphs: &[&str],
    normalizer: &dyn WordNormalizer,
) -> String {
    if paragraphs.len() < MIN_SUPPORT + 1 {
        return summary.to_string();
    }

    let paragraph_sets: Vec<HashSet<String>> = paragraphs
        .iter()
        .map(|paragraph| normalized_words(paragraph, normalizer).into_iter().collect())
        .collect();

    let mut kept = Vec::new();
    for sentence in split_sentences(summary) {
        let content: Vec<String> = normalized_words(sentence, normalizer)
            .into_iter()
            .filter(|word| char_len(word) >= MIN_CONTENT_WORD_CHARS)
            .collect();
        if content.is_empty() {
            kept.push(sentence);
            continue;
        }
        let rare = content
            .iter()
            .filter(|word| {
                paragraph_sets
                    .iter()
                    .filter(|set| set.contains(*word))
                    .count()
                    < MIN_SUPPORT
            })
            .count();
        let drop = (content.len() <= FEW_CONTENT_WORDS && rare > 0)
            || rare as f64 / content.len() as f64 > MAX_RARE_FRACTION;
        if !drop {
            kept.push(sentence);
        }
    }

    let filtered = ensure_terminal(&kept.join(". "));
    if char_len(&filtered) < KEEP_MIN_CHARS || kept.len() < KEEP_MIN_SENTENCES {
        return summary.to_string();
    }
    filtered
}
