//! Cross-paragraph consensus filter for multi-review input.
//!
//! When many independent reviews are concatenated into one document, sentences
//! that no other review corroborates are usually idiosyncratic noise. A
//! sentence survives when at least one other paragraph contains something
//! similar to it.

use super::text::{
    WordNormalizer, bigram_overlap, char_len, ensure_terminal, normalized_words, split_paragraphs,
    split_sentences,
};

/// Minimum number of paragraphs that must attest content (incl. its own).
pub(crate) const MIN_SUPPORT: usize = 2;

const SUPPORT_SIMILARITY: f64 = 0.25;
const NOISE_SENTENCE_CHARS: usize = 5;

/// Drop sentences attested by no other paragraph; keep paragraph order.
///
/// Documents with fewer than `MIN_SUPPORT + 1` paragraphs are returned
/// unchanged. A paragraph that would lose all of its sentences keeps its
/// original text instead, so a whole review is never erased.
pub(crate) fn coverage_filter(text: &str, normalizer: &dyn WordNormalizer) -> String {
    let paragraphs = split_paragraphs(text);
    if paragraphs.len() < MIN_SUPPORT + 1 {
        return text.to_string();
    }

    // sentences of <= 5 chars are discarded as noise before voting
    let sentences: Vec<Vec<(&str, Vec<String>)>> = paragraphs
        .iter()
        .map(|paragraph| {
            split_sentences(paragraph)
                .into_iter()
                .filter(|sentence| char_len(sentence) > NOISE_SENTENCE_CHARS)
                .map(|sentence| (sentence, normalized_words(sentence, normalizer)))
                .collect()
        })
        .collect();

    let mut filtered = Vec::with_capacity(paragraphs.len());
    for (index, paragraph_sentences) in sentences.iter().enumerate() {
        let kept: Vec<&str> = paragraph_sentences
            .iter()
            .filter(|(_, words)| supporting_paragraphs(words, &sentences, index) >= MIN_SUPPORT - 1)
            .map(|(sentence, _)| *sentence)
            .collect();
        if kept.is_empty() {
            filtered.push(paragraphs[index].to_string());
        } else {
            filtered.push(ensure_terminal(&kept.join(". ")));
        }
    }
    filtered.join("\n\n")
}

fn supporting_paragraphs(
    words: &[String],
    sentences: &[Vec<(&str, Vec<String>)>],
    own_index: usize,
) -> usize {
    sentences
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != own_index)
        .filter(|(_, others)| {
            others
                .iter()
                .any(|(_, other_words)| bigram_overlap(words, other_words) >= SUPPORT_SIMILARITY)
        })
        .count()
}
