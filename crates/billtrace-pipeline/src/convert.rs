//! Explicit mappings from each stage crate's local error type to the
//! shared [`PipelineError`] taxonomy, per spec.md §7. Kept as free
//! functions rather than `From` impls: neither `PipelineError` nor the
//! stage error types are local to this crate, so a trait impl would be an
//! orphan-rule violation here.

use billtrace_models::PipelineError;

pub fn browser_err(err: billtrace_browser::Error) -> PipelineError {
    match err {
        billtrace_browser::Error::BotChallenge { url } => {
            PipelineError::BotChallengeDetected { url }
        }
        billtrace_browser::Error::NavigationTimeout { url, elapsed_secs } => {
            PipelineError::NavigationTimeout { url, elapsed_secs }
        }
        billtrace_browser::Error::DownloadTimeout { url, elapsed_secs } => {
            PipelineError::DownloadTimeout { url, elapsed_secs }
        }
        other => PipelineError::BrowserSession {
            reason: other.to_string(),
        },
    }
}

pub fn storage_err(err: billtrace_storage::Error) -> PipelineError {
    use billtrace_storage::Error as StorageError;

    let path = match &err {
        StorageError::CreateDir { path, .. }
        | StorageError::Read { path, .. }
        | StorageError::Write { path, .. }
        | StorageError::Decode { path, .. }
        | StorageError::Encode { path, .. } => path.display().to_string(),
    };

    PipelineError::Storage {
        path,
        reason: err.to_string(),
    }
}

pub fn llm_err(err: billtrace_llm::Error) -> PipelineError {
    match err {
        billtrace_llm::Error::SchemaMismatch { reason, .. } => {
            PipelineError::LlmSchemaFailure {
                bill: String::new(),
                reason,
            }
        }
        other => PipelineError::LlmTransportError(other.to_string()),
    }
}

pub fn portal_err(bill: &str, err: billtrace_portal::Error) -> PipelineError {
    match err {
        billtrace_portal::Error::EmptyBill { bill } => PipelineError::EmptyBill { bill },
        billtrace_portal::Error::Browser(e) => browser_err(e),
        billtrace_portal::Error::Llm(e) => with_bill(llm_err(e), bill),
        billtrace_portal::Error::ChronologyInvalid { bill, reason } => {
            PipelineError::ChronologyInvalid { bill, reason }
        }
        billtrace_portal::Error::MalformedHref { href, reason } => {
            PipelineError::ChronologyInvalid {
                bill: bill.to_string(),
                reason: format!("malformed document link {href:?}: {reason}"),
            }
        }
    }
}

pub fn document_fetch_err(name: &str, url: &str, err: billtrace_documents::Error) -> PipelineError {
    match err {
        billtrace_documents::Error::Browser(e) => browser_err(e),
        billtrace_documents::Error::Storage(e) => storage_err(e),
        billtrace_documents::Error::PdfExtraction { reason, .. } => {
            PipelineError::DocumentFetchFailed {
                name: name.to_string(),
                url: url.to_string(),
                reason,
            }
        }
    }
}

pub fn notes_err(bill: &str, err: billtrace_notes::Error) -> PipelineError {
    match err {
        billtrace_notes::Error::Llm(e) => with_bill(llm_err(e), bill),
        billtrace_notes::Error::SchemaFailure {
            bill,
            checkpoint,
            reason,
        } => PipelineError::LlmSchemaFailure {
            bill,
            reason: format!("checkpoint {checkpoint}: {reason}"),
        },
    }
}

/// Fills in a bill id that a lower-level conversion couldn't know about
/// (the LLM client's own errors carry only the endpoint, not the job).
fn with_bill(err: PipelineError, bill: &str) -> PipelineError {
    match err {
        PipelineError::LlmSchemaFailure { reason, .. } => PipelineError::LlmSchemaFailure {
            bill: bill.to_string(),
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billtrace_models::ErrorKind;

    #[test]
    fn browser_bot_challenge_maps_to_named_kind() {
        let err = browser_err(billtrace_browser::Error::BotChallenge {
            url: "https://example.test/bill".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::BotChallengeDetected);
    }

    #[test]
    fn browser_launch_falls_back_to_browser_session_kind() {
        let err = browser_err(billtrace_browser::Error::Io {
            path: "/tmp/does-not-exist".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        });
        assert_eq!(err.kind(), ErrorKind::BrowserSession);
    }

    #[test]
    fn portal_empty_bill_preserves_the_bill_id() {
        let err = portal_err(
            "HB_1_2025",
            billtrace_portal::Error::EmptyBill {
                bill: "HB_1_2025".to_string(),
            },
        );
        match err {
            PipelineError::EmptyBill { bill } => assert_eq!(bill, "HB_1_2025"),
            other => panic!("expected EmptyBill, got {other:?}"),
        }
    }

    #[test]
    fn notes_llm_error_is_tagged_with_the_calling_bill() {
        let err = notes_err(
            "HB_1_2025",
            billtrace_notes::Error::Llm(billtrace_llm::Error::SchemaMismatch {
                endpoint: "https://llm.test".to_string(),
                reason: "missing field overview".to_string(),
            }),
        );
        match err {
            PipelineError::LlmSchemaFailure { bill, reason } => {
                assert_eq!(bill, "HB_1_2025");
                assert!(reason.contains("overview"));
            }
            other => panic!("expected LlmSchemaFailure, got {other:?}"),
        }
    }
}
