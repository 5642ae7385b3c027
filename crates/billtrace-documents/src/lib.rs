//! Per-document text extraction (Stage 3) and monetary-amount extraction
//! (Stage 4). Documents are fetched sequentially through a shared browser
//! session and normalized to plain text; the extracted text is then scanned
//! for every dollar amount it contains.

pub mod download;
pub mod error;
pub mod extract;
pub mod numbers;

pub use download::fetch_document;
pub use error::Error;
pub use extract::extract_visible_text;
pub use numbers::extract_money_occurrences;
