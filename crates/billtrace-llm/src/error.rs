/// Errors surfaced by the LLM/embedding collaborators. Per spec.md §6 these
/// must distinguish parse failures (the service answered, but not with valid
/// JSON matching the schema) from transport failures (the service didn't
/// answer at all).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("response from {endpoint} did not match the expected schema: {reason}")]
    SchemaMismatch { endpoint: String, reason: String },

    #[error("embedding response from {endpoint} had {got} vectors, expected {expected}")]
    EmbeddingCountMismatch {
        endpoint: String,
        expected: usize,
        got: usize,
    },
}
