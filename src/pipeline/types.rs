//! Core types and error definitions for the summarization pipeline.

use crate::model::ModelClientError;
use thiserror::Error;

/// Errors emitted by the summarization pipeline.
///
/// The text stages themselves are total over strings; the only failure source
/// is the model runtime, and such failures abort the document (and, for
/// batches, the whole batch) without internal retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The summarization runtime failed to produce output.
    #[error("Summarization model call failed: {0}")]
    Model(#[from] ModelClientError),
}

/// Behavior switches for a summarization request.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeOptions {
    /// Enable multi-piece processing for oversized input.
    pub chunk: bool,
    /// Request a second-pass re-summarization of merged chunk output when it
    /// is long enough to warrant one.
    pub condense: bool,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            chunk: true,
            condense: false,
        }
    }
}
