#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Browser(#[from] billtrace_browser::Error),

    #[error(transparent)]
    Storage(#[from] billtrace_storage::Error),

    #[error("failed to extract text from {path}: {reason}")]
    PdfExtraction {
        path: std::path::PathBuf,
        reason: String,
    },
}
