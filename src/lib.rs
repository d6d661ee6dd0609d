#![deny(missing_docs)]

//! Core library for the svodka review-summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// CSV/JSON/JSONL review extraction.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization model client abstraction.
pub mod model;
/// Text pipeline: chunking, filtering, dedup, and cleanup.
pub mod pipeline;
