//! Repetition removal for merged chunk summaries and raw model output.
//!
//! Generation over chunked input repeats itself in three ways: whole sentences
//! recur across chunk summaries, near-duplicate sentences differ only in
//! inflection, and clauses repeat inside one sentence ("быстро и быстро").
//! Each gets its own pass here, plus a fixer for sentence boundaries that
//! chunked summarization tends to over-segment.

use super::text::{
    WordNormalizer, bigram_overlap, char_len, ensure_terminal, normalized_words, split_sentences,
    subset_fraction, tokenize,
};
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

const SMART_DUPLICATE_SIMILARITY: f64 = 0.55;
const SUBSET_THRESHOLD: f64 = 0.8;
const MIN_DEDUPE_CHARS: usize = 10;
const MIN_CLAUSE_CHARS: usize = 2;

/// Remove sentences that repeat an earlier sentence verbatim (case-insensitive).
pub(crate) fn dedupe_sentences_light(text: &str) -> String {
    if char_len(text) < MIN_DEDUPE_CHARS {
        return text.trim().to_string();
    }
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for part in text.split('.') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if seen.insert(part.to_lowercase()) {
            kept.push(part);
        }
    }
    ensure_terminal(&kept.join(". "))
}

/// Remove near-duplicate sentences, preferring the more complete phrasing.
///
/// A sentence is a duplicate of an already accepted one when their bigram
/// overlap reaches 0.55 or its word set is a 0.8-subset of the accepted
/// sentence's. When an accepted sentence is itself a 0.8-subset of the
/// newcomer, the newcomer replaces it in place.
pub(crate) fn dedupe_sentences_smart(text: &str, normalizer: &dyn WordNormalizer) -> String {
    if char_len(text) < MIN_DEDUPE_CHARS {
        return text.trim().to_string();
    }

    struct Accepted {
        sentence: String,
        words: Vec<String>,
        set: HashSet<String>,
    }

    let mut accepted: Vec<Accepted> = Vec::new();
    for sentence in split_sentences(text) {
        let words = normalized_words(sentence, normalizer);
        let set: HashSet<String> = words.iter().cloned().collect();

        let duplicate = accepted.iter().any(|prior| {
            bigram_overlap(&words, &prior.words) >= SMART_DUPLICATE_SIMILARITY
                || subset_fraction(&set, &prior.set) >= SUBSET_THRESHOLD
        });
        if duplicate {
            continue;
        }

        let entry = Accepted {
            sentence: sentence.to_string(),
            words,
            set,
        };
        match accepted
            .iter()
            .position(|prior| subset_fraction(&prior.set, &entry.set) >= SUBSET_THRESHOLD)
        {
            Some(index) => accepted[index] = entry,
            None => accepted.push(entry),
        }
    }

    let kept: Vec<&str> = accepted
        .iter()
        .map(|entry| entry.sentence.as_str())
        .collect();
    ensure_terminal(&kept.join(". "))
}

static WORD_AND_SAME_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s+и\s+(\w+)\b").expect("valid regex"));
static TRAILING_AND_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+и\s+(\w+)\s*$").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse repeated clauses and "`слово` и `слово`" doublings.
///
/// Splits on periods and commas, drops degenerate and repeated clauses
/// (case-insensitive), and rejoins the survivors with `". "`. Idempotent;
/// strings under 10 characters pass through trimmed.
pub(crate) fn dedupe_clauses(summary: &str) -> String {
    if char_len(summary) < MIN_DEDUPE_CHARS {
        return summary.trim().to_string();
    }

    // the regex crate has no backreferences; compare the capture groups instead
    let collapsed = WORD_AND_SAME_WORD.replace_all(summary, |caps: &Captures| {
        if caps[1].to_lowercase() == caps[2].to_lowercase() {
            caps[1].to_string()
        } else {
            caps[0].to_string()
        }
    });

    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    for clause in collapsed.split(['.', ',']) {
        let mut clause = WHITESPACE_RUN
            .replace_all(clause.trim(), " ")
            .into_owned();
        if char_len(&clause) < MIN_CLAUSE_CHARS {
            continue;
        }
        if let Some(caps) = TRAILING_AND_WORD.captures(&clause) {
            let word = caps[1].to_lowercase();
            let rest = clause[..caps.get(0).expect("match").start()].to_string();
            if tokenize(&rest).iter().any(|token| *token == word) {
                clause = rest.trim_end().to_string();
            }
        }
        if seen.insert(clause.to_lowercase()) {
            kept.push(clause);
        }
    }
    if kept.is_empty() {
        return summary.trim().to_string();
    }
    kept.join(". ")
}

static BOUNDARY_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\.\s+потому что\b", ", потому что"),
        (r"(?i)\.\s+поэтому\b", ", поэтому"),
        (r"(?i)\.\s+но\s+", ", но "),
        (r"(?i)\.\s+что\s+", ", что "),
        (r"(?i)\.\s+и\s+", ", и "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Rejoin clauses that chunked summarization split into separate sentences.
///
/// A period followed by a subordinating or coordinating conjunction (потому
/// что, поэтому, но, что, и) is an over-segmentation artifact; convert it back
/// into a comma join.
pub(crate) fn fix_sentence_boundaries(text: &str) -> String {
    if char_len(text) < MIN_DEDUPE_CHARS {
        return text.trim().to_string();
    }
    let mut fixed = text.trim().to_string();
    for (pattern, replacement) in BOUNDARY_FIXES.iter() {
        fixed = pattern.replace_all(&fixed, *replacement).into_owned();
    }
    fixed
}
