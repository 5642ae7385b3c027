use chrono::{DateTime, Utc};

use crate::error::ErrorKind;

/// Lifecycle state of a per-bill pipeline run, per spec.md §3/§4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

/// Process-wide job record, owned by the queue. `id` is the bill's canonical
/// form and doubles as the KV liveness key suffix (`job:{id}`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    /// Cooperative cancellation flag, checked between documents (§4.4) and
    /// checkpoints (§4.6).
    #[serde(default)]
    pub cancel_requested: bool,
}

impl Job {
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Queued,
            started_at: None,
            finished_at: None,
            error_kind: None,
            error_message: None,
            cancel_requested: false,
        }
    }

    pub fn liveness_key(id: &str) -> String {
        format!("job:{id}")
    }
}
