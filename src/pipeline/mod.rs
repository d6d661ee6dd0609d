//! Multi-stage summarization pipeline: chunking, consensus filtering, model
//! invocation, merging, and cleanup.

mod chunking;
mod cleanup;
mod coverage;
mod dedupe;
mod rarity;
mod service;
/// Text splitting, normalization, and similarity primitives.
pub mod text;
/// Pipeline options and error definitions.
pub mod types;

pub use service::{Summarizer, SummarizerApi};
pub use text::{PrefixStemmer, WordNormalizer};
pub use types::{PipelineError, SummarizeOptions};
