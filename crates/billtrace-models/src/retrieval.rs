use chrono::{DateTime, Utc};

/// One row of `retrieval_log.json`: the outcome of fetching a single
/// document, recorded whether it succeeded or not so operators can audit
/// the whole run, not just its failures.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetrievalLogEntry {
    pub document_name: String,
    pub url: String,
    pub outcome: RetrievalOutcome,
    pub extractor: Option<Extractor>,
    pub bytes_extracted: usize,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Ok,
    EmptyAfterExtraction,
    Failed,
}

/// Which extraction library produced the text, per spec.md §4.4's
/// primary/secondary PDF fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    Html,
    PdfPrimary,
    PdfSecondary,
}
