/// Stable error-kind identifiers recorded on job metadata, per the taxonomy
/// table in spec.md §7. These are the `error_kind` values a job record
/// exposes externally — never the `Display` text of the underlying error,
/// which may change between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    BotChallengeDetected,
    NavigationTimeout,
    DownloadTimeout,
    EmptyBill,
    ChronologyInvalid,
    DocumentFetchFailed,
    LlmSchemaFailure,
    LlmTransportError,
    Timeout,
    CancelRequested,
    /// Browser-session-level failure (launch, CDP protocol, disk) that
    /// precedes any specific navigation — not named as its own row in
    /// spec.md §7, but the taxonomy has to hold it somewhere.
    BrowserSession,
    /// Filesystem/JSON-artifact failure outside the document-fetch path.
    Storage,
}

impl ErrorKind {
    /// Whether this error kind is recoverable in place (the pipeline
    /// degrades and continues) rather than fatal to the job, per spec.md §7.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::DocumentFetchFailed | ErrorKind::ChronologyInvalid
        )
    }
}

/// The workspace-wide pipeline error. Stage-local error types convert into
/// this at their crate boundary; it is never constructed from stringly-typed
/// information directly within a stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("bot challenge detected while navigating {url}")]
    BotChallengeDetected { url: String },

    #[error("navigation to {url} timed out after {elapsed_secs}s")]
    NavigationTimeout { url: String, elapsed_secs: u64 },

    #[error("download from {url} timed out after {elapsed_secs}s")]
    DownloadTimeout { url: String, elapsed_secs: u64 },

    #[error("bill {bill} has no status rows or no documents")]
    EmptyBill { bill: String },

    #[error("chronology response for {bill} failed validation: {reason}")]
    ChronologyInvalid { bill: String, reason: String },

    #[error("failed to fetch document {name} from {url}: {reason}")]
    DocumentFetchFailed {
        name: String,
        url: String,
        reason: String,
    },

    #[error("LLM response for {bill} did not match the expected schema: {reason}")]
    LlmSchemaFailure { bill: String, reason: String },

    #[error("LLM transport error: {0}")]
    LlmTransportError(String),

    #[error("job {bill} exceeded its time budget")]
    Timeout { bill: String },

    #[error("job {bill} was cancelled")]
    CancelRequested { bill: String },

    #[error("browser session failure: {reason}")]
    BrowserSession { reason: String },

    #[error("storage failure at {path}: {reason}")]
    Storage { path: String, reason: String },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::BotChallengeDetected { .. } => ErrorKind::BotChallengeDetected,
            PipelineError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            PipelineError::DownloadTimeout { .. } => ErrorKind::DownloadTimeout,
            PipelineError::EmptyBill { .. } => ErrorKind::EmptyBill,
            PipelineError::ChronologyInvalid { .. } => ErrorKind::ChronologyInvalid,
            PipelineError::DocumentFetchFailed { .. } => ErrorKind::DocumentFetchFailed,
            PipelineError::LlmSchemaFailure { .. } => ErrorKind::LlmSchemaFailure,
            PipelineError::LlmTransportError(_) => ErrorKind::LlmTransportError,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::CancelRequested { .. } => ErrorKind::CancelRequested,
            PipelineError::BrowserSession { .. } => ErrorKind::BrowserSession,
            PipelineError::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }
}
