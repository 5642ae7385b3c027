#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to launch browser: {0}")]
    Launch(#[source] chromiumoxide::error::CdpError),

    #[error("bot challenge detected while navigating {url}")]
    BotChallenge { url: String },

    #[error("navigation to {url} timed out after {elapsed_secs}s")]
    NavigationTimeout { url: String, elapsed_secs: u64 },

    #[error("download from {url} timed out after {elapsed_secs}s")]
    DownloadTimeout { url: String, elapsed_secs: u64 },

    #[error("CDP call failed: {0}")]
    Cdp(#[source] chromiumoxide::error::CdpError),

    #[error("filesystem error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(source: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(source)
    }
}

impl Error {
    /// Whether spec.md §7's error table calls for a retry (bot-challenge or
    /// timeout) rather than an immediate failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::BotChallenge { .. } | Error::NavigationTimeout { .. } | Error::DownloadTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_challenge_and_timeouts_are_retryable() {
        assert!(Error::BotChallenge { url: "x".into() }.is_retryable());
        assert!(Error::NavigationTimeout { url: "x".into(), elapsed_secs: 30 }.is_retryable());
        assert!(Error::DownloadTimeout { url: "x".into(), elapsed_secs: 60 }.is_retryable());
    }

    #[test]
    fn other_errors_are_not_retryable() {
        assert!(!Error::Io {
            path: "x".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        }
        .is_retryable());
    }
}
