//! HTTP client for the summarization model runtime.
//!
//! The runtime exposes a single `POST /summarize` endpoint wrapping a
//! sequence-to-sequence model (ruT5 by default). This module owns request
//! shaping, input truncation to the model's token budget, and error mapping.

use crate::config::get_config;
use crate::pipeline::text::byte_offset;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiktoken_rs::CoreBPE;

const NUM_BEAMS: u32 = 4;
const NO_REPEAT_NGRAM: u32 = 3;
const REPETITION_PENALTY: f64 = 2.5;

/// Errors from the model runtime client.
#[derive(Debug, Error)]
pub enum ModelClientError {
    /// The runtime could not be reached or does not serve the endpoint.
    #[error("Summarization runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    /// The runtime answered with an error status.
    #[error("Summary generation failed ({status}): {body}")]
    GenerationFailed {
        /// HTTP status returned by the runtime.
        status: u16,
        /// Response body, for the logs.
        body: String,
    },
    /// The runtime answered 200 but the body did not parse.
    #[error("Invalid runtime response: {0}")]
    InvalidResponse(String),
}

/// One generation request to the runtime.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    /// Source text (will be truncated to the input token budget).
    pub text: String,
    /// Upper bound on generated tokens.
    pub max_length: usize,
    /// Lower bound on generated tokens.
    pub min_length: usize,
}

/// Produces an abstractive summary for a piece of text.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Generate a summary; returns the raw model output.
    async fn summarize(&self, request: SummaryRequest) -> Result<String, ModelClientError>;
}

#[derive(Serialize)]
struct RuntimePayload<'a> {
    model: &'a str,
    text: &'a str,
    max_length: usize,
    min_length: usize,
    num_beams: u32,
    no_repeat_ngram_size: u32,
    repetition_penalty: f64,
    early_stopping: bool,
}

#[derive(Deserialize)]
struct RuntimeResponse {
    summary: String,
}

/// Client for an HTTP summarization runtime.
pub struct RemoteModelClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_input_tokens: usize,
    // ruT5 uses a SentencePiece vocabulary; cl100k counts are an approximation
    // that errs close enough for a truncation budget
    encoding: Option<CoreBPE>,
}

impl RemoteModelClient {
    /// Build a client for the given runtime base URL and model name.
    pub fn new(base_url: &str, model: &str, max_input_tokens: usize) -> Self {
        let encoding = tiktoken_rs::cl100k_base().ok();
        if encoding.is_none() {
            tracing::warn!("Tokenizer unavailable, using whitespace token estimates");
        }
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_input_tokens,
            encoding,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/summarize", self.base_url)
    }

    fn count_tokens(&self, text: &str) -> usize {
        match &self.encoding {
            Some(encoding) => encoding.encode_ordinary(text).len(),
            None => text.split_whitespace().count(),
        }
    }

    /// Truncate `text` to at most `max_input_tokens` tokens.
    ///
    /// Binary search over character boundaries; re-encoding a prefix can
    /// change token counts, so a direct token-slice is not safe here.
    fn truncate_to_budget<'a>(&self, text: &'a str) -> &'a str {
        if self.count_tokens(text) <= self.max_input_tokens {
            return text;
        }
        let total_chars = text.chars().count();
        let mut low = 0usize;
        let mut high = total_chars;
        while low < high {
            let mid = (low + high + 1) / 2;
            let prefix = &text[..byte_offset(text, mid)];
            if self.count_tokens(prefix) <= self.max_input_tokens {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        let truncated = &text[..byte_offset(text, low)];
        tracing::debug!(
            original_chars = total_chars,
            kept_chars = low,
            budget = self.max_input_tokens,
            "Truncated model input to token budget"
        );
        truncated
    }
}

#[async_trait]
impl SummaryModel for RemoteModelClient {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, ModelClientError> {
        let text = self.truncate_to_budget(&request.text);
        let payload = RuntimePayload {
            model: &self.model,
            text,
            max_length: request.max_length,
            min_length: request.min_length,
            num_beams: NUM_BEAMS,
            no_repeat_ngram_size: NO_REPEAT_NGRAM,
            repetition_penalty: REPETITION_PENALTY,
            early_stopping: true,
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelClientError::RuntimeUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelClientError::RuntimeUnavailable(format!(
                "endpoint {} not found",
                self.endpoint()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelClientError::GenerationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RuntimeResponse = response
            .json()
            .await
            .map_err(|e| ModelClientError::InvalidResponse(e.to_string()))?;
        Ok(parsed.summary)
    }
}

/// Build the model client described by the process configuration.
pub fn get_summary_model() -> Box<dyn SummaryModel + Send + Sync> {
    let config = get_config();
    Box::new(RemoteModelClient::new(
        &config.model_url,
        &config.model,
        config.max_input_tokens,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn summarize_posts_payload_and_parses_summary() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/summarize")
                    .json_body_partial(r#"{"model": "test-model", "num_beams": 4}"#);
                then.status(200)
                    .json_body(serde_json::json!({"summary": "Краткий итог."}));
            })
            .await;

        let client = RemoteModelClient::new(&server.base_url(), "test-model", 512);
        let summary = client
            .summarize(SummaryRequest {
                text: "Длинный отзыв о товаре.".to_string(),
                max_length: 160,
                min_length: 10,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary, "Краткий итог.");
    }

    #[tokio::test]
    async fn error_status_maps_to_generation_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/summarize");
                then.status(500).body("model exploded");
            })
            .await;

        let client = RemoteModelClient::new(&server.base_url(), "test-model", 512);
        let err = client
            .summarize(SummaryRequest {
                text: "Отзыв.".to_string(),
                max_length: 160,
                min_length: 10,
            })
            .await
            .unwrap_err();

        match err {
            ModelClientError::GenerationFailed { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_maps_to_runtime_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/summarize");
                then.status(404);
            })
            .await;

        let client = RemoteModelClient::new(&server.base_url(), "test-model", 512);
        let err = client
            .summarize(SummaryRequest {
                text: "Отзыв.".to_string(),
                max_length: 160,
                min_length: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModelClientError::RuntimeUnavailable(_)));
    }

    #[test]
    fn truncation_respects_token_budget() {
        let client = RemoteModelClient::new("http://localhost:9", "test-model", 8);
        let text = "слово ".repeat(100);
        let truncated = client.truncate_to_budget(&text);
        assert!(client.count_tokens(truncated) <= 8);
        assert!(!truncated.is_empty());
    }

    #[test]
    fn short_input_is_not_truncated() {
        let client = RemoteModelClient::new("http://localhost:9", "test-model", 512);
        let text = "Короткий отзыв о товаре.";
        assert_eq!(client.truncate_to_budget(text), text);
    }
}
