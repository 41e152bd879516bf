//! Chunk store loading.
//!
//! The ingest step writes `store/base.json` with the extracted manual
//! chunks. Loading filters out records without usable text; the number of
//! skipped records is reported to the caller rather than treated as fatal.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::StoreError;

/// A bounded span of extracted manual text tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    /// Origin document name (e.g. `MANUAL_FINANCEIRO.pdf`).
    pub source: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

/// Outcome of a store load.
#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    pub chunks: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct StoreFile {
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    docs: Vec<RawChunk>,
}

#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    start: usize,
    #[serde(default)]
    end: usize,
    #[serde(default)]
    length: Option<usize>,
}

/// Reads and filters the chunk store.
///
/// Records with missing or whitespace-only text are dropped; ids missing
/// from the file are assigned sequentially.
pub fn load_store(path: &Path) -> Result<(Vec<Chunk>, LoadReport), StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path)?;
    let parsed: StoreFile = serde_json::from_str(&raw)?;

    if let Some(created_at) = parsed.created_at {
        tracing::debug!("chunk store built at {}", created_at);
    }

    let total = parsed.docs.len();
    let mut chunks = Vec::with_capacity(total);

    for (index, record) in parsed.docs.into_iter().enumerate() {
        let Some(text) = record.text else { continue };
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let length = record.length.unwrap_or_else(|| text.chars().count());
        chunks.push(Chunk {
            id: record.id.unwrap_or(index as u64 + 1),
            source: record.source.unwrap_or_else(|| "unknown".to_string()),
            text,
            start: record.start,
            end: record.end,
            length,
        });
    }

    let report = LoadReport {
        chunks: chunks.len(),
        skipped: total - chunks.len(),
    };

    if report.skipped > 0 {
        tracing::warn!(
            "load_store: {} invalid chunks dropped (missing or blank text)",
            report.skipped
        );
    }

    Ok((chunks, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_store(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = load_store(Path::new("/nonexistent/base.json"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn blank_records_are_skipped_and_counted() {
        let file = write_store(
            r#"{"docs": [
                {"id": 1, "source": "A.pdf", "text": "Primeiro trecho válido."},
                {"id": 2, "source": "A.pdf", "text": "   "},
                {"source": "B.pdf"}
            ]}"#,
        );

        let (chunks, report) = load_store(file.path()).unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(chunks[0].source, "A.pdf");
    }

    #[test]
    fn missing_ids_are_assigned_sequentially() {
        let file = write_store(
            r#"{"docs": [
                {"source": "A.pdf", "text": "Um."},
                {"source": "B.pdf", "text": "Dois."}
            ]}"#,
        );

        let (chunks, _) = load_store(file.path()).unwrap();
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[1].id, 2);
    }

    #[test]
    fn text_is_trimmed_and_length_defaulted() {
        let file = write_store(r#"{"docs": [{"source": "A.pdf", "text": "  ok então  "}]}"#);

        let (chunks, _) = load_store(file.path()).unwrap();
        assert_eq!(chunks[0].text, "ok então");
        assert_eq!(chunks[0].length, "ok então".chars().count());
    }
}
