//! HTTP surface: health, direct summarization, and file upload endpoints.
//!
//! Handlers are generic over [`SummarizerApi`] so tests can swap in a stub
//! service without a model runtime. Errors leave as a uniform JSON envelope
//! with a machine code and a user-facing Russian message.

use crate::{
    config::get_config,
    ingest::{self, IngestError},
    pipeline::{PipelineError, SummarizeOptions, SummarizerApi},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Build the application router over any summarizer implementation.
pub fn create_router<S: SummarizerApi + 'static>(service: Arc<S>) -> Router {
    let upload_limit = get_config().max_file_mb * 1024 * 1024;
    Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize::<S>))
        .route("/summarize-file", post(summarize_file::<S>))
        .layer(DefaultBodyLimit::max(upload_limit + 64 * 1024))
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "svodka",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    texts: Option<Vec<String>>,
}

impl SummarizeRequest {
    /// A non-empty `texts` list wins over `text`; blank items inside the list
    /// are legal and come back as empty summaries.
    fn into_texts(self) -> Result<Vec<String>, ApiError> {
        if let Some(texts) = self.texts {
            if !texts.is_empty() {
                return Ok(texts);
            }
        }
        match self.text {
            Some(text) if !text.trim().is_empty() => Ok(vec![text]),
            _ => Err(ApiError::empty_text()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummarizeItem {
    summary: String,
    original_length: usize,
}

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    success: bool,
    summaries: Vec<SummarizeItem>,
    count: usize,
}

async fn summarize<S: SummarizerApi>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let texts = request.into_texts()?;
    tracing::info!(count = texts.len(), "Summarization request");
    let summaries = service.summarize_batch(&texts, true).await?;
    Ok(Json(build_response(&texts, summaries)))
}

fn build_response(texts: &[String], summaries: Vec<String>) -> SummarizeResponse {
    let summaries: Vec<SummarizeItem> = texts
        .iter()
        .zip(summaries)
        .map(|(original, summary)| SummarizeItem {
            summary,
            original_length: original.chars().count(),
        })
        .collect();
    SummarizeResponse {
        count: summaries.len(),
        success: true,
        summaries,
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    /// Summarize the whole file as one combined document.
    #[serde(default = "default_true")]
    combine: bool,
    /// Keep per-review detail in combined mode (skips the condensing pass).
    #[serde(default = "default_true")]
    detail: bool,
}

#[derive(Debug, Serialize)]
struct FileStats {
    total_rows: usize,
    extracted_texts: usize,
    summarized: usize,
    skipped: usize,
}

#[derive(Debug, Serialize)]
struct FileSummarizeResponse {
    success: bool,
    summaries: Vec<SummarizeItem>,
    count: usize,
    stats: FileStats,
}

async fn summarize_file<S: SummarizerApi>(
    State(service): State<Arc<S>>,
    Query(query): Query<FileQuery>,
    mut multipart: Multipart,
) -> Result<Json<FileSummarizeResponse>, ApiError> {
    let config = get_config();
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request("INVALID_MULTIPART", e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request("INVALID_MULTIPART", e.to_string()))?;
            upload = Some((filename, data));
            break;
        }
    }
    let Some((filename, data)) = upload else {
        return Err(ApiError::bad_request(
            "MISSING_FILE",
            "В запросе не найдено поле file".to_string(),
        ));
    };
    if data.is_empty() {
        return Err(ApiError::bad_request(
            "EMPTY_FILE",
            "Загруженный файл пуст".to_string(),
        ));
    }

    let extraction = ingest::extract_texts(
        &data,
        &filename,
        config.max_file_items,
        config.max_file_mb * 1024 * 1024,
    )?;
    let extracted = extraction.texts.len();
    tracing::info!(
        filename = %filename,
        total_rows = extraction.total_rows,
        extracted,
        combine = query.combine,
        "File summarization request"
    );

    if query.combine {
        let document = extraction.texts.join("\n\n");
        let summary = service
            .summarize_one(
                &document,
                SummarizeOptions {
                    chunk: true,
                    condense: !query.detail,
                },
            )
            .await?;
        let summaries = if summary.is_empty() {
            Vec::new()
        } else {
            vec![SummarizeItem {
                original_length: document.chars().count(),
                summary,
            }]
        };
        let stats = FileStats {
            total_rows: extraction.total_rows,
            extracted_texts: extracted,
            summarized: summaries.len(),
            skipped: extraction.skipped,
        };
        return Ok(Json(FileSummarizeResponse {
            success: true,
            count: summaries.len(),
            summaries,
            stats,
        }));
    }

    let summaries = service.summarize_batch(&extraction.texts, true).await?;
    let response = build_response(&extraction.texts, summaries);
    Ok(Json(FileSummarizeResponse {
        success: true,
        count: response.count,
        summaries: response.summaries,
        stats: FileStats {
            total_rows: extraction.total_rows,
            extracted_texts: extracted,
            summarized: extracted,
            skipped: extraction.skipped,
        },
    }))
}

/// API error carrying a status, a machine code, and a Russian message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn bad_request(code: &'static str, message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message,
            detail: None,
        }
    }

    fn empty_text() -> Self {
        Self::bad_request(
            "EMPTY_INPUT",
            "Не передан текст для суммаризации".to_string(),
        )
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let detail = err.to_string();
        let (status, code, message) = match err {
            IngestError::UnsupportedFormat(_) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FORMAT",
                "Неподдерживаемый формат файла, ожидается CSV, JSON или JSONL",
            ),
            IngestError::FileTooLarge { .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_FILE",
                "Файл превышает допустимый размер",
            ),
            IngestError::MissingTextColumn => (
                StatusCode::BAD_REQUEST,
                "INVALID_FILE",
                "В файле не найдена колонка с текстом отзыва",
            ),
            IngestError::Csv(_) | IngestError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "PARSE_ERROR",
                "Не удалось разобрать содержимое файла",
            ),
        };
        Self {
            status,
            code,
            message: message.to_string(),
            detail: Some(detail),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        tracing::error!(error = %err, "Summarization failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "SUMMARIZATION_ERROR",
            message: "Не удалось получить краткое содержание".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.message,
                "detail": self.detail,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONFIG, Config};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn ensure_test_config() {
        let _ = CONFIG.set(Config::from_env().expect("config"));
    }

    /// Reverses each input so tests can tell summaries from echoes.
    struct StubSummarizer;

    #[async_trait::async_trait]
    impl SummarizerApi for StubSummarizer {
        async fn summarize_one(
            &self,
            input: &str,
            _options: SummarizeOptions,
        ) -> Result<String, PipelineError> {
            Ok(format!("резюме: {}", input.chars().take(20).collect::<String>()))
        }

        async fn summarize_batch(
            &self,
            texts: &[String],
            _chunk: bool,
        ) -> Result<Vec<String>, PipelineError> {
            Ok(texts
                .iter()
                .map(|text| {
                    if text.trim().is_empty() {
                        String::new()
                    } else {
                        format!("резюме: {}", text.chars().take(20).collect::<String>())
                    }
                })
                .collect())
        }
    }

    fn app() -> Router {
        ensure_test_config();
        create_router(Arc::new(StubSummarizer))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service_and_version() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "svodka");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn summarize_single_text() {
        let request = Request::post("/summarize")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text": "Отличный товар, рекомендую."}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(
            body["summaries"][0]["original_length"],
            "Отличный товар, рекомендую.".chars().count()
        );
    }

    #[tokio::test]
    async fn summarize_texts_list_takes_priority() {
        let request = Request::post("/summarize")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"text": "игнорируется", "texts": ["Первый отзыв.", "", "Третий отзыв."]}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["summaries"][1]["summary"], "");
    }

    #[tokio::test]
    async fn empty_request_is_rejected_with_envelope() {
        let request = Request::post("/summarize")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text": "   "}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "EMPTY_INPUT");
    }

    fn multipart_body(boundary: &str, filename: &str, content: &str) -> Body {
        let body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\ncontent-type: text/csv\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Body::from(body)
    }

    #[tokio::test]
    async fn file_upload_batch_mode_returns_stats() {
        let boundary = "XBOUNDARY";
        let request = Request::post("/summarize-file?combine=false")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(multipart_body(
                boundary,
                "reviews.csv",
                "text\nХороший товар\n\"\"\nПлохая доставка\n",
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["total_rows"], 3);
        assert_eq!(body["stats"]["extracted_texts"], 2);
        assert_eq!(body["stats"]["skipped"], 1);
        // blank rows are dropped at extraction, not echoed as empty summaries
        assert_eq!(body["count"], 2);
        assert_eq!(body["summaries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn file_upload_combine_mode_returns_one_summary() {
        let boundary = "XBOUNDARY";
        let request = Request::post("/summarize-file")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(multipart_body(
                boundary,
                "reviews.csv",
                "text\nХороший товар\nБыстрая доставка\n",
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["stats"]["summarized"], 1);
    }

    #[tokio::test]
    async fn unsupported_upload_format_is_rejected() {
        let boundary = "XBOUNDARY";
        let request = Request::post("/summarize-file")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(multipart_body(boundary, "reviews.xlsx", "data"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNSUPPORTED_FORMAT");
    }

    #[tokio::test]
    async fn file_without_text_column_maps_to_invalid_file() {
        let boundary = "XBOUNDARY";
        let request = Request::post("/summarize-file")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(multipart_body(boundary, "reviews.csv", "id,rating\n1,5\n"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_FILE");
    }

    #[test]
    fn oversized_file_maps_to_invalid_file_bad_request() {
        let err = ApiError::from(IngestError::FileTooLarge { limit_mb: 10 });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_FILE");
    }

    /// Summarizer that never produces output, for the empty-combine path.
    struct SilentSummarizer;

    #[async_trait::async_trait]
    impl SummarizerApi for SilentSummarizer {
        async fn summarize_one(
            &self,
            _input: &str,
            _options: SummarizeOptions,
        ) -> Result<String, PipelineError> {
            Ok(String::new())
        }

        async fn summarize_batch(
            &self,
            texts: &[String],
            _chunk: bool,
        ) -> Result<Vec<String>, PipelineError> {
            Ok(vec![String::new(); texts.len()])
        }
    }

    #[tokio::test]
    async fn combine_mode_with_empty_summary_reports_nothing_summarized() {
        ensure_test_config();
        let app = create_router(Arc::new(SilentSummarizer));
        let boundary = "XBOUNDARY";
        let request = Request::post("/summarize-file")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(multipart_body(
                boundary,
                "reviews.csv",
                "text\nХороший товар\n",
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
        assert_eq!(body["summaries"].as_array().unwrap().len(), 0);
        assert_eq!(body["stats"]["summarized"], 0);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        let request = Request::post("/summarize-file")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "MISSING_FILE");
    }
}
