//! CSV catalog loader: one [`Document`] per data row.
//!
//! - `page_content` is `"{column}: {value}"` per column, newline-joined, in
//!   header order (keys and values trimmed).
//! - `metadata` holds `source` (the path), `row` (0-based index) and every
//!   column value as a string.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::document::Document;
use crate::errors::RagError;

/// Reads every row of a UTF-8 CSV file with a header line.
///
/// A file without a header yields no documents. Short rows are padded with
/// empty values so that every document carries every column.
///
/// # Errors
/// - [`RagError::Io`] / [`RagError::Csv`] if the file cannot be read or parsed.
pub fn load_csv_documents(path: impl AsRef<Path>) -> Result<Vec<Document>, RagError> {
    let path = path.as_ref();
    info!("Loading catalog documents from {:?}", path);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        debug!("Catalog {:?} has no header row", path);
        return Ok(Vec::new());
    }

    let source = path.to_string_lossy().into_owned();
    let mut out = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let mut lines = Vec::with_capacity(headers.len());
        let mut doc = Document::new(String::new())
            .with_metadata("source", source.clone())
            .with_metadata("row", row as u64);

        for (i, column) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or_default();
            lines.push(format!("{}: {}", column.trim(), value.trim()));
            doc.metadata
                .insert(column.to_string(), Value::String(value.to_string()));
        }

        doc.page_content = lines.join("\n");
        out.push(doc);
    }

    debug!("Loaded {} catalog documents", out.len());
    Ok(out)
}
