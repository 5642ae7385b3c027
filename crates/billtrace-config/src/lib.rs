//! Process configuration, mirroring `agent::main::Args`'s
//! `clap::Parser` + `env` attribute shape: every field is settable by flag
//! or environment variable, with the defaults spec.md §6 names.

use std::path::PathBuf;

/// The billtrace pipeline's environment, per spec.md §6's
/// "Environment / config" table.
#[derive(clap::Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// Hard ceiling on in-flight bill pipeline runs (spec.md §5: default 7,
    /// hard ceiling 10).
    #[clap(long = "max-concurrent-jobs", env = "MAX_CONCURRENT_JOBS", default_value = "7")]
    pub max_concurrent_jobs: usize,

    /// Hostname of the legislature portal the acquisition pipeline scrapes.
    #[clap(long = "portal-host", env = "PORTAL_HOST")]
    pub portal_host: String,

    /// `host:port` of the Redis-compatible KV store backing job liveness.
    #[clap(long = "kv-address", env = "KV_ADDRESS")]
    pub kv_address: String,

    /// Endpoint of the LLM completion collaborator (chronology + note
    /// generation).
    #[clap(long = "llm-endpoint", env = "LLM_ENDPOINT")]
    pub llm_endpoint: String,

    /// Endpoint of the sentence-embedding collaborator.
    #[clap(long = "embed-endpoint", env = "EMBED_ENDPOINT")]
    pub embed_endpoint: String,

    /// Root directory under which `bills/{id}/` artifact trees are written.
    #[clap(long = "bills-root", env = "BILLS_ROOT")]
    pub bills_root: PathBuf,

    /// Per-job overall time budget in seconds (spec.md §5: default 3600).
    #[clap(long = "job-timeout-sec", env = "JOB_TIMEOUT_SEC", default_value = "3600")]
    pub job_timeout_sec: u64,

    /// Per-download timeout in seconds (spec.md §4.1: default 60).
    #[clap(long = "download-timeout-sec", env = "DOWNLOAD_TIMEOUT_SEC", default_value = "60")]
    pub download_timeout_sec: u64,

    /// Admission-gate poll interval in seconds (spec.md §4.8: 5s).
    #[clap(long = "dequeue-interval-sec", env = "DEQUEUE_INTERVAL_SEC", default_value = "5")]
    pub dequeue_interval_sec: u64,
}

impl Config {
    pub fn job_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.job_timeout_sec)
    }

    pub fn download_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.download_timeout_sec)
    }

    pub fn dequeue_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dequeue_interval_sec)
    }
}
