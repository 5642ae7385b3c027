#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bill {bill} has no status rows or no documents")]
    EmptyBill { bill: String },

    #[error(transparent)]
    Browser(#[from] billtrace_browser::Error),

    #[error(transparent)]
    Llm(#[from] billtrace_llm::Error),

    #[error("chronology response for {bill} failed validation: {reason}")]
    ChronologyInvalid { bill: String, reason: String },

    #[error("malformed document href {href:?}: {reason}")]
    MalformedHref { href: String, reason: String },
}
