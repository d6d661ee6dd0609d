//! Review extraction from uploaded files (CSV, JSON, JSONL).
//!
//! Uploads are small enough to buffer whole; parsing is synchronous. Text
//! cells are whitespace-normalized but otherwise untouched; the pipeline does
//! its own cleanup.

use serde_json::Value;
use thiserror::Error;

/// Column/field names recognized as review text, in priority order.
const TEXT_COLUMN_ALIASES: [&str; 6] = [
    "text",
    "content",
    "review",
    "feedback",
    "comment",
    "original_text",
];

/// Errors from file parsing and text extraction.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The filename extension is not one of csv, json, jsonl.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    /// The upload exceeds the configured size limit.
    #[error("File exceeds the {limit_mb} MB limit")]
    FileTooLarge {
        /// Configured limit, for the error message.
        limit_mb: usize,
    },
    /// No recognized text column/field was found.
    #[error("No text column found; expected one of: text, content, review, feedback, comment, original_text")]
    MissingTextColumn,
    /// The CSV payload failed to parse.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    /// The JSON payload failed to parse.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Review texts pulled out of an upload, plus how many rows were scanned.
#[derive(Debug)]
pub struct Extraction {
    /// Whitespace-normalized, non-empty review texts, in file order.
    pub texts: Vec<String>,
    /// Rows or records encountered in the file (capped at the row limit).
    pub total_rows: usize,
    /// Rows that carried no usable text (blank cell, missing field, bad line).
    pub skipped: usize,
}

/// Extract review texts from an uploaded file.
///
/// The format is chosen by filename extension. At most `max_rows` rows are
/// read; `max_bytes` bounds the raw payload size.
pub fn extract_texts(
    data: &[u8],
    filename: &str,
    max_rows: usize,
    max_bytes: usize,
) -> Result<Extraction, IngestError> {
    if data.len() > max_bytes {
        return Err(IngestError::FileTooLarge {
            limit_mb: max_bytes / (1024 * 1024),
        });
    }
    let extension = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => extract_csv(data, max_rows),
        "json" => extract_json(data, max_rows),
        "jsonl" | "ndjson" => extract_jsonl(data, max_rows),
        other => Err(IngestError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_csv(data: &[u8], max_rows: usize) -> Result<Extraction, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_lowercase())
        .collect();
    let column = TEXT_COLUMN_ALIASES
        .iter()
        .find_map(|alias| headers.iter().position(|header| header == alias))
        .ok_or(IngestError::MissingTextColumn)?;

    let mut texts = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    for record in reader.byte_records() {
        if total_rows >= max_rows {
            break;
        }
        total_rows += 1;
        // lossy decoding: a bad byte in one cell should not fail the upload
        let cell = record?
            .get(column)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        let text = clean_text(&cell);
        if text.is_empty() {
            skipped += 1;
        } else {
            texts.push(text);
        }
    }
    Ok(Extraction {
        texts,
        total_rows,
        skipped,
    })
}

fn extract_json(data: &[u8], max_rows: usize) -> Result<Extraction, IngestError> {
    let value: Value = serde_json::from_slice(data)?;
    let items = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("items")
            .or_else(|| map.get("data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(IngestError::MissingTextColumn)?,
        _ => return Err(IngestError::MissingTextColumn),
    };

    let mut texts = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    let mut any_field_found = false;
    for item in items.iter().take(max_rows) {
        total_rows += 1;
        let text = match item_text(item) {
            Some(text) => {
                any_field_found = true;
                clean_text(&text)
            }
            None => String::new(),
        };
        if text.is_empty() {
            skipped += 1;
        } else {
            texts.push(text);
        }
    }
    if total_rows > 0 && !any_field_found {
        return Err(IngestError::MissingTextColumn);
    }
    Ok(Extraction {
        texts,
        total_rows,
        skipped,
    })
}

fn extract_jsonl(data: &[u8], max_rows: usize) -> Result<Extraction, IngestError> {
    let body = String::from_utf8_lossy(data);
    let mut texts = Vec::new();
    let mut total_rows = 0;
    let mut skipped = 0;
    for line in body.lines() {
        if total_rows >= max_rows {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total_rows += 1;
        // malformed lines are skipped rather than failing the whole upload
        let Ok(item) = serde_json::from_str::<Value>(line) else {
            tracing::warn!(line_number = total_rows, "Skipping malformed JSONL line");
            skipped += 1;
            continue;
        };
        let text = item_text(&item).map(|t| clean_text(&t)).unwrap_or_default();
        if text.is_empty() {
            skipped += 1;
        } else {
            texts.push(text);
        }
    }
    Ok(Extraction {
        texts,
        total_rows,
        skipped,
    })
}

fn item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => TEXT_COLUMN_ALIASES
            .iter()
            .find_map(|alias| map.get(*alias))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Collapse all whitespace runs (incl. newlines) to single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_BYTES: usize = 10 * 1024 * 1024;

    #[test]
    fn csv_extracts_text_column_by_alias() {
        let data = "id,review,rating\n1,Товар отличный,5\n2,Не понравилось,2\n";
        let extraction = extract_texts(data.as_bytes(), "reviews.csv", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.total_rows, 2);
        assert_eq!(extraction.texts, vec!["Товар отличный", "Не понравилось"]);
    }

    #[test]
    fn csv_without_text_column_is_rejected() {
        let data = "id,rating\n1,5\n";
        let err = extract_texts(data.as_bytes(), "reviews.csv", 100, MAX_BYTES).unwrap_err();
        assert!(matches!(err, IngestError::MissingTextColumn));
    }

    #[test]
    fn csv_respects_row_limit() {
        let data = "text\nпервый\nвторой\nтретий\n";
        let extraction = extract_texts(data.as_bytes(), "reviews.csv", 2, MAX_BYTES).unwrap();
        assert_eq!(extraction.texts.len(), 2);
    }

    #[test]
    fn json_array_of_objects() {
        let data = r#"[{"text": "Первый отзыв"}, {"text": "Второй  отзыв"}]"#;
        let extraction = extract_texts(data.as_bytes(), "reviews.json", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.texts, vec!["Первый отзыв", "Второй отзыв"]);
    }

    #[test]
    fn json_object_with_items_key() {
        let data = r#"{"items": [{"content": "Отзыв из обёртки"}]}"#;
        let extraction = extract_texts(data.as_bytes(), "reviews.json", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.texts, vec!["Отзыв из обёртки"]);
    }

    #[test]
    fn json_array_of_strings() {
        let data = r#"["Просто строка", "Ещё строка"]"#;
        let extraction = extract_texts(data.as_bytes(), "reviews.json", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.texts, vec!["Просто строка", "Ещё строка"]);
    }

    #[test]
    fn jsonl_skips_malformed_lines() {
        let data = "{\"text\": \"Хороший товар\"}\nnot json\n{\"text\": \"Плохая доставка\"}\n";
        let extraction = extract_texts(data.as_bytes(), "reviews.jsonl", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.total_rows, 3);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.texts, vec!["Хороший товар", "Плохая доставка"]);
    }

    #[test]
    fn blank_csv_rows_are_dropped_and_counted() {
        let data = "text\nХороший товар\n\"\"\n\"   \"\nПлохая доставка\n";
        let extraction = extract_texts(data.as_bytes(), "reviews.csv", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.total_rows, 4);
        assert_eq!(extraction.skipped, 2);
        assert_eq!(extraction.texts, vec!["Хороший товар", "Плохая доставка"]);
    }

    #[test]
    fn json_items_without_text_are_dropped_and_counted() {
        let data = r#"[{"text": "Первый отзыв"}, {"text": ""}, {"rating": 5}]"#;
        let extraction = extract_texts(data.as_bytes(), "reviews.json", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.total_rows, 3);
        assert_eq!(extraction.skipped, 2);
        assert_eq!(extraction.texts, vec!["Первый отзыв"]);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = extract_texts(b"data", "reviews.xlsx", 100, MAX_BYTES).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(ext) if ext == "xlsx"));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let err = extract_texts(&[0u8; 64], "reviews.csv", 100, 16).unwrap_err();
        assert!(matches!(err, IngestError::FileTooLarge { .. }));
    }

    #[test]
    fn whitespace_runs_are_collapsed() {
        let data = "text\n\"Товар   пришёл\nбыстро\"\n";
        let extraction = extract_texts(data.as_bytes(), "reviews.csv", 100, MAX_BYTES).unwrap();
        assert_eq!(extraction.texts, vec!["Товар пришёл быстро"]);
    }
}
