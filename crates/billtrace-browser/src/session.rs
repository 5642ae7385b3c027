use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::Rng;
use tracing::{instrument, warn};

use crate::error::Error;
use crate::retry::backoff_delay;
use crate::stealth;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Retry ceiling and backoff base for `get_with_retry`/`download_with_retry`,
/// per spec.md §4.1 ("≤3 attempts") and Scenario 5's "5s, 10s, 20s + jitter".
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(5);

/// A browser reused across every document of one bill (spec.md §4.1: "A
/// single session is reused for all documents of one bill").
pub struct BrowserSession {
    browser: Browser,
    _handler: tokio::task::JoinHandle<()>,
    download_dir: PathBuf,
    last_navigated_domain: Option<String>,
}

impl BrowserSession {
    /// Launches a browser isolated to `job_id`'s deterministic debugging
    /// port, applying the three-tier stealth fallback of spec.md §4.1.
    #[instrument(skip(download_dir), fields(port))]
    pub async fn open(job_id: &str, download_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let download_dir = download_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&download_dir)
            .await
            .map_err(|source| Error::Io {
                path: download_dir.clone(),
                source,
            })?;

        let port = stealth::port_for_job(job_id);
        tracing::Span::current().record("port", port);
        let chrome_major = stealth::detect_chrome_major_version();

        let browser = match Self::launch(port, chrome_major, &download_dir, true).await {
            Ok(browser) => browser,
            Err(err) => {
                warn!(error = %err, "full-stealth launch failed, retrying with minimal options");
                Self::launch(port, None, &download_dir, false).await?
            }
        };

        let (browser, mut handler) = browser;
        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            _handler: handle,
            download_dir,
            last_navigated_domain: None,
        })
    }

    async fn launch(
        port: u16,
        chrome_major: Option<u32>,
        download_dir: &Path,
        full_stealth: bool,
    ) -> Result<(Browser, chromiumoxide::Handler), Error> {
        let args = if full_stealth {
            stealth::full_stealth_args()
        } else {
            stealth::minimal_args()
        };
        let user_agent = stealth::user_agent(chrome_major);

        let mut builder = BrowserConfig::builder()
            .args(args)
            .user_data_dir(download_dir.join(".profile"))
            .port(port)
            .user_agent(user_agent);
        if std::env::var("BILLTRACE_BROWSER_HEADFUL").is_err() {
            builder = builder.with_head().disable_default_args();
        }
        let config = builder
            .build()
            .map_err(|e| Error::Launch(chromiumoxide::error::CdpError::msg(e)))?;

        Browser::launch(config).await.map_err(Error::Launch)
    }

    /// Navigates to `url`, waiting for a body element with no bot-challenge
    /// marker in its visible text, per spec.md §4.1.
    #[instrument(skip(self))]
    pub async fn get(&mut self, url: &str) -> Result<String, Error> {
        self.wait_between_navigations(url).await;

        let page = self.browser.new_page(url).await?;
        page.evaluate(stealth::STEALTH_INIT_SCRIPT).await.ok();

        let deadline = Instant::now() + NAVIGATION_TIMEOUT;
        loop {
            let html = page.content().await.unwrap_or_default();
            let has_body = html.contains("<body");
            if has_body && !stealth::looks_like_bot_challenge(&html) {
                return Ok(html);
            }
            if has_body && stealth::looks_like_bot_challenge(&html) {
                return Err(Error::BotChallenge { url: url.to_string() });
            }
            if Instant::now() >= deadline {
                return Err(Error::NavigationTimeout {
                    url: url.to_string(),
                    elapsed_secs: NAVIGATION_TIMEOUT.as_secs(),
                });
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    /// `get`, retried up to [`RETRY_ATTEMPTS`] times with jittered
    /// exponential backoff whenever the failure is a bot challenge or
    /// navigation timeout, per spec.md §4.1/§7 and Scenario 5. Any other
    /// error (e.g. a CDP failure) propagates immediately — it isn't one of
    /// the retryable kinds the spec names.
    #[instrument(skip(self))]
    pub async fn get_with_retry(&mut self, url: &str) -> Result<String, Error> {
        let mut attempt = 0;
        loop {
            match self.get(url).await {
                Ok(html) => return Ok(html),
                Err(err) if err.is_retryable() && attempt + 1 < RETRY_ATTEMPTS => {
                    warn!(attempt, error = %err, url, "retrying navigation after backoff");
                    tokio::time::sleep(backoff_delay(RETRY_BASE, attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// `download`, retried the same way as [`Self::get_with_retry`].
    #[instrument(skip(self))]
    pub async fn download_with_retry(
        &mut self,
        url: &str,
        expected_ext: &str,
    ) -> Result<PathBuf, Error> {
        let mut attempt = 0;
        loop {
            match self.download(url, expected_ext).await {
                Ok(path) => return Ok(path),
                Err(err) if err.is_retryable() && attempt + 1 < RETRY_ATTEMPTS => {
                    warn!(attempt, error = %err, url, "retrying download after backoff");
                    tokio::time::sleep(backoff_delay(RETRY_BASE, attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Clears `download_dir`, triggers a download, and polls for a file with
    /// `expected_ext`, per spec.md §4.1.
    #[instrument(skip(self))]
    pub async fn download(&mut self, url: &str, expected_ext: &str) -> Result<PathBuf, Error> {
        self.clear_download_dir().await?;
        self.wait_between_navigations(url).await;

        let _page: Page = self.browser.new_page(url).await?;

        let deadline = Instant::now() + DOWNLOAD_TIMEOUT;
        loop {
            if let Some(path) = self.find_completed_download(expected_ext).await? {
                return Ok(path);
            }
            if Instant::now() >= deadline {
                return Err(Error::DownloadTimeout {
                    url: url.to_string(),
                    elapsed_secs: DOWNLOAD_TIMEOUT.as_secs(),
                });
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
    }

    async fn find_completed_download(&self, expected_ext: &str) -> Result<Option<PathBuf>, Error> {
        let mut entries =
            tokio::fs::read_dir(&self.download_dir)
                .await
                .map_err(|source| Error::Io {
                    path: self.download_dir.clone(),
                    source,
                })?;
        while let Some(entry) = entries.next_entry().await.map_err(|source| Error::Io {
            path: self.download_dir.clone(),
            source,
        })? {
            let path = entry.path();
            let is_partial = path
                .extension()
                .is_some_and(|ext| ext == "crdownload" || ext == "tmp");
            if is_partial {
                return Ok(None);
            }
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(expected_ext))
            {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    async fn clear_download_dir(&self) -> Result<(), Error> {
        let mut entries =
            tokio::fs::read_dir(&self.download_dir)
                .await
                .map_err(|source| Error::Io {
                    path: self.download_dir.clone(),
                    source,
                })?;
        while let Some(entry) = entries.next_entry().await.map_err(|source| Error::Io {
            path: self.download_dir.clone(),
            source,
        })? {
            let path = entry.path();
            if path.is_file() {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|source| Error::Io { path, source })?;
            }
        }
        Ok(())
    }

    /// Randomized delay before each navigation: 0.5-2s normally, 2-6s the
    /// first time this session visits a given domain, per spec.md §4.1.
    async fn wait_between_navigations(&mut self, url: &str) {
        let domain = url
            .split("//")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or(url)
            .to_string();
        let first_visit = self.last_navigated_domain.as_deref() != Some(domain.as_str());
        self.last_navigated_domain = Some(domain);

        let (low, high) = if first_visit { (2000, 6000) } else { (500, 2000) };
        let millis = rand::thread_rng().gen_range(low..high);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Releases the browser process and deletes `download_dir`, per
    /// spec.md §4.1.
    pub async fn close(mut self) -> Result<(), Error> {
        self.browser.close().await.map_err(Error::Cdp)?;
        self.browser.wait().await.ok();
        if self.download_dir.exists() {
            tokio::fs::remove_dir_all(&self.download_dir)
                .await
                .map_err(|source| Error::Io {
                    path: self.download_dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
