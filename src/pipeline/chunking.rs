//! Splitting oversized documents into model-sized, order-preserving chunks.
//!
//! Documents with blank-line structure are packed paragraph by paragraph under
//! an adaptive character limit (more paragraphs means smaller chunks, so that
//! many short reviews are not starved of summary budget). Unstructured text is
//! packed sentence by sentence; a sentence that alone exceeds the limit is hard
//! cut at the last whitespace before it.

use super::text::{byte_offset, char_len};

/// Split `text` into ordered chunks no longer than the applicable limit.
///
/// Returns the text as a single chunk when it already fits, and an empty vector
/// for blank input.
pub(crate) fn chunk_text(text: &str, max_source_chars: usize) -> Vec<String> {
    if char_len(text) <= max_source_chars {
        return if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }
    if text.contains("\n\n") {
        chunk_by_paragraphs(text, max_source_chars)
    } else {
        chunk_sentences(text, max_source_chars)
    }
}

fn chunk_by_paragraphs(text: &str, max_source_chars: usize) -> Vec<String> {
    let blocks: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect();
    if blocks.is_empty() {
        return Vec::new();
    }

    let n = blocks.len();
    let limit = if n >= 6 {
        700
    } else if n >= 4 {
        1000
    } else {
        max_source_chars
    };
    let max_chars = max_source_chars.min(limit);

    let mut chunks = Vec::new();
    let mut current = String::new();
    for block in blocks {
        if char_len(block) > max_chars {
            // An oversized paragraph is split by sentence against the
            // configured maximum, not the adaptive limit.
            chunks.extend(chunk_sentences(block, max_source_chars));
            current.clear();
            continue;
        }
        let candidate_len = if current.is_empty() {
            char_len(block)
        } else {
            char_len(&current) + 2 + char_len(block)
        };
        if candidate_len <= max_chars {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(block);
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(block);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn chunk_sentences(text: &str, max_chars: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }

    let flattened = text.replace(['!', '?'], ".");
    let mut chunks = Vec::new();
    let mut current = String::new();
    for sentence in flattened.split('.') {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if char_len(&current) + char_len(sentence) + 1 <= max_chars {
            if !current.is_empty() {
                current.push_str(". ");
            }
            current.push_str(sentence);
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if char_len(sentence) > max_chars {
                let head = &sentence[..byte_offset(sentence, max_chars)];
                let part = match head.rfind(char::is_whitespace) {
                    Some(cut) if !head[..cut].trim_end().is_empty() => head[..cut].trim_end(),
                    _ => head,
                };
                chunks.push(part.to_string());
                current = sentence[part.len()..].trim().to_string();
            } else {
                current = sentence.to_string();
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
