#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Llm(#[from] billtrace_llm::Error),

    #[error("LLM response for {bill} checkpoint {checkpoint} did not match the expected schema after repair: {reason}")]
    SchemaFailure {
        bill: String,
        checkpoint: String,
        reason: String,
    },
}
