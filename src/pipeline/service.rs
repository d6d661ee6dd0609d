//! Summarizer service coordinating the full pipeline for one or many documents.

use crate::{
    config::get_config,
    model::{SummaryModel, SummaryRequest, get_summary_model},
    pipeline::{
        chunking, coverage,
        cleanup::CleanupChain,
        dedupe, rarity,
        text::{self, PrefixStemmer, WordNormalizer},
        types::{PipelineError, SummarizeOptions},
    },
};
use async_trait::async_trait;

/// Inputs at or under this length are returned verbatim, bypassing the model.
const IDENTITY_MAX_CHARS: usize = 250;
/// Inputs under this length get a tighter generation budget.
const SHORT_INPUT_CHARS: usize = 300;
const SHORT_INPUT_MAX_TOKENS: usize = 50;
const SHORT_INPUT_MIN_TOKENS: usize = 5;
const DEFAULT_MIN_TOKENS: usize = 10;
/// Merged chunk output must exceed this length to earn a second model pass.
const SECOND_PASS_MIN_CHARS: usize = 300;

/// Coordinates chunking, per-chunk model calls, merging, and post-filters.
///
/// The service owns the model client for its whole lifetime; construct it once
/// near process start and share it through an `Arc`. Documents in a batch are
/// processed strictly in order; dedup state accumulates across sentences
/// within one document, so no internal parallelism is used.
pub struct Summarizer {
    model: Box<dyn SummaryModel + Send + Sync>,
    normalizer: Box<dyn WordNormalizer + Send + Sync>,
    cleanup: CleanupChain,
}

/// Abstraction over the summarization pipeline used by the HTTP surface.
#[async_trait]
pub trait SummarizerApi: Send + Sync {
    /// Summarize one document according to `options`.
    async fn summarize_one(
        &self,
        input: &str,
        options: SummarizeOptions,
    ) -> Result<String, PipelineError>;

    /// Summarize many documents, preserving order and cardinality.
    async fn summarize_batch(
        &self,
        texts: &[String],
        chunk: bool,
    ) -> Result<Vec<String>, PipelineError>;
}

impl Summarizer {
    /// Build a summarizer backed by the configured model runtime.
    pub fn new() -> Self {
        Self::with_model(get_summary_model())
    }

    /// Build a summarizer around an explicit model client (used by tests).
    pub fn with_model(model: Box<dyn SummaryModel + Send + Sync>) -> Self {
        let config = get_config();
        Self {
            model,
            normalizer: Box::new(PrefixStemmer::default()),
            cleanup: CleanupChain::new(config.dataset_hooks),
        }
    }

    /// Summarize a single document.
    ///
    /// Empty input yields an empty summary and text at or under 250 characters
    /// is returned unchanged; neither touches the model. Longer documents flow
    /// through consensus filtering, chunked or single-shot generation,
    /// merging/dedup, and the cleanup chain.
    pub async fn summarize_one(
        &self,
        input: &str,
        options: SummarizeOptions,
    ) -> Result<String, PipelineError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        if text::char_len(trimmed) <= IDENTITY_MAX_CHARS {
            return Ok(trimmed.to_string());
        }

        let config = get_config();
        let paragraphs = text::split_paragraphs(trimmed);
        let multi_review = paragraphs.len() >= coverage::MIN_SUPPORT + 1;

        let source = if multi_review {
            coverage::coverage_filter(trimmed, self.normalizer.as_ref())
        } else {
            trimmed.to_string()
        };

        let mut summary = if options.chunk && text::char_len(&source) > config.max_source_chars {
            self.summarize_chunked(&source, multi_review, options.condense)
                .await?
        } else {
            self.summarize_single(&source).await?
        };

        if multi_review {
            summary =
                rarity::filter_rare_sentences(&summary, &paragraphs, self.normalizer.as_ref());
        }
        Ok(self.cleanup.apply(&summary))
    }

    /// Summarize a list of documents sequentially, in input order.
    ///
    /// Blank items map to empty summaries without a model call. A model
    /// failure on any item aborts the whole batch.
    pub async fn summarize_batch(
        &self,
        texts: &[String],
        chunk: bool,
    ) -> Result<Vec<String>, PipelineError> {
        let options = SummarizeOptions {
            chunk,
            condense: false,
        };
        let mut summaries = Vec::with_capacity(texts.len());
        for item in texts {
            if item.trim().is_empty() {
                summaries.push(String::new());
                continue;
            }
            summaries.push(self.summarize_one(item, options).await?);
        }
        Ok(summaries)
    }

    async fn summarize_chunked(
        &self,
        source: &str,
        multi_review: bool,
        condense: bool,
    ) -> Result<String, PipelineError> {
        let config = get_config();
        let chunks = chunking::chunk_text(source, config.max_source_chars);
        tracing::debug!(
            input_chars = text::char_len(source),
            chunks = chunks.len(),
            "Chunked oversized document"
        );

        let mut partials = Vec::new();
        for chunk in &chunks {
            if chunk.trim().is_empty() {
                continue;
            }
            let partial = self.summarize_single(chunk).await?;
            if !partial.is_empty() {
                partials.push(partial);
            }
        }
        if partials.is_empty() {
            return Ok(String::new());
        }

        let merged = self.merge_partials(&partials, multi_review);
        if condense && partials.len() >= 2 {
            let merged_len = text::char_len(&merged);
            if merged_len > SECOND_PASS_MIN_CHARS && merged_len <= config.max_source_chars {
                return self.summarize_single(&merged).await;
            }
        }
        Ok(dedupe::fix_sentence_boundaries(&merged))
    }

    /// Join chunk summaries and remove cross-chunk repetition.
    fn merge_partials(&self, partials: &[String], multi_review: bool) -> String {
        let normalized: Vec<String> = partials
            .iter()
            .map(|partial| partial.trim())
            .filter(|partial| !partial.is_empty())
            .map(text::ensure_terminal)
            .collect();
        let combined = normalized.join(" ");
        let deduped = if multi_review {
            dedupe::dedupe_sentences_smart(&combined, self.normalizer.as_ref())
        } else {
            dedupe::dedupe_sentences_light(&combined)
        };
        dedupe::dedupe_clauses(&deduped)
    }

    /// One model invocation plus the per-call repetition fixes.
    async fn summarize_single(&self, input: &str) -> Result<String, PipelineError> {
        let config = get_config();
        let trimmed = input.trim();
        let input_len = text::char_len(trimmed);
        let (max_length, min_length) = if input_len < SHORT_INPUT_CHARS {
            (
                SHORT_INPUT_MAX_TOKENS.min(config.max_output_tokens),
                SHORT_INPUT_MIN_TOKENS,
            )
        } else {
            (config.max_output_tokens, DEFAULT_MIN_TOKENS)
        };

        let raw = self
            .model
            .summarize(SummaryRequest {
                text: trimmed.to_string(),
                max_length,
                min_length,
            })
            .await?;

        let mut summary = dedupe::dedupe_clauses(raw.trim());
        // a "summary" longer than its input means the model went off the
        // rails; fall back to the deduped input itself
        if text::char_len(&summary) > input_len {
            summary = dedupe::dedupe_clauses(trimmed);
        }
        Ok(dedupe::fix_sentence_boundaries(&summary))
    }
}

#[async_trait]
impl SummarizerApi for Summarizer {
    async fn summarize_one(
        &self,
        input: &str,
        options: SummarizeOptions,
    ) -> Result<String, PipelineError> {
        Summarizer::summarize_one(self, input, options).await
    }

    async fn summarize_batch(
        &self,
        texts: &[String],
        chunk: bool,
    ) -> Result<Vec<String>, PipelineError> {
        Summarizer::summarize_batch(self, texts, chunk).await
    }
}
