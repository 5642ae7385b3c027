//! Job submission, the bounded-concurrency admission gate, and liveness
//! bookkeeping, per spec.md §4.8.

use std::collections::HashMap;
use std::time::Duration;

use billtrace_models::{ErrorKind, Job, JobState};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::error::Error;
use crate::kv::KvStore;

const LIVENESS_PATTERN: &str = "job:*";

/// The process-wide job queue. `jobs` is the in-memory mirror the rest of
/// the orchestrator reads job records from; `kv` is the external liveness
/// store the admission gate counts keys against (spec.md §4.8/§5).
pub struct JobQueue<K> {
    kv: K,
    jobs: Mutex<HashMap<String, Job>>,
    max_concurrent: usize,
    poll_interval: Duration,
}

impl<K: KvStore> JobQueue<K> {
    pub fn new(kv: K, max_concurrent: usize, poll_interval: Duration) -> Self {
        Self {
            kv,
            jobs: Mutex::new(HashMap::new()),
            max_concurrent,
            poll_interval,
        }
    }

    /// Idempotent submission: if `bill_id` is already `queued` or `running`,
    /// returns the existing record rather than starting a second run.
    #[instrument(skip(self))]
    pub async fn enqueue(&self, bill_id: &str) -> Job {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.get(bill_id) {
            if matches!(existing.state, JobState::Queued | JobState::Running) {
                return existing.clone();
            }
        }
        let job = Job::queued(bill_id);
        jobs.insert(bill_id.to_string(), job.clone());
        job
    }

    /// Blocks, polling every `poll_interval`, until the count of `job:*`
    /// keys in the store is below `max_concurrent`, then writes this job's
    /// liveness key and marks it `running`.
    #[instrument(skip(self))]
    pub async fn admit(&self, bill_id: &str) -> Result<(), Error> {
        loop {
            let live = self.kv.scan(LIVENESS_PATTERN).await?;
            if live.len() < self.max_concurrent {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        self.kv.set(&Job::liveness_key(bill_id), "running").await?;

        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(bill_id) {
            job.state = JobState::Running;
            job.started_at = Some(chrono::Utc::now());
        }
        info!(bill_id, "admitted");
        Ok(())
    }

    /// Marks the job `done` and releases its liveness key, per spec.md
    /// §4.8: "The job key is written on admission and deleted on
    /// completion... the key's presence is the liveness signal."
    #[instrument(skip(self))]
    pub async fn complete(&self, bill_id: &str) -> Result<(), Error> {
        self.kv.del(&Job::liveness_key(bill_id)).await?;
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(bill_id) {
            job.state = JobState::Done;
            job.finished_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    /// Marks the job `failed` with the given error kind/message and
    /// releases its liveness key, per spec.md §7: "the liveness key is
    /// released so a successor may re-enqueue."
    #[instrument(skip(self))]
    pub async fn fail(&self, bill_id: &str, kind: ErrorKind, message: String) -> Result<(), Error> {
        self.kv.del(&Job::liveness_key(bill_id)).await?;
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(bill_id) {
            job.state = JobState::Failed;
            job.finished_at = Some(chrono::Utc::now());
            job.error_kind = Some(kind);
            job.error_message = Some(message);
        }
        Ok(())
    }

    /// Flags cooperative cancellation. Stages check this between documents
    /// (§4.4) and between checkpoints (§4.6); no in-flight LLM call is
    /// interrupted (spec.md §4.8).
    pub async fn request_cancel(&self, bill_id: &str) {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(bill_id) {
            job.cancel_requested = true;
        }
    }

    pub async fn is_cancel_requested(&self, bill_id: &str) -> bool {
        self.jobs
            .lock()
            .await
            .get(bill_id)
            .map(|job| job.cancel_requested)
            .unwrap_or(false)
    }

    pub async fn get(&self, bill_id: &str) -> Option<Job> {
        self.jobs.lock().await.get(bill_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Default)]
    struct FakeKv {
        keys: StdMutex<HashSet<String>>,
    }

    impl KvStore for FakeKv {
        async fn set(&self, key: &str, _value: &str) -> Result<(), Error> {
            self.keys.lock().unwrap().insert(key.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, Error> {
            Ok(self
                .keys
                .lock()
                .unwrap()
                .get(key)
                .map(|_| "running".to_string()))
        }

        async fn del(&self, key: &str) -> Result<(), Error> {
            self.keys.lock().unwrap().remove(key);
            Ok(())
        }

        async fn scan(&self, _pattern: &str) -> Result<Vec<String>, Error> {
            Ok(self.keys.lock().unwrap().iter().cloned().collect())
        }
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_while_running() {
        let queue = JobQueue::new(FakeKv::default(), 7, Duration::from_millis(1));
        let first = queue.enqueue("HB_1_2025").await;
        queue.admit("HB_1_2025").await.unwrap();
        let second = queue.enqueue("HB_1_2025").await;
        assert_eq!(first.id, second.id);
        assert_eq!(second.state, JobState::Running);
    }

    #[tokio::test]
    async fn admit_proceeds_immediately_under_capacity() {
        let queue = JobQueue::new(FakeKv::default(), 7, Duration::from_millis(1));
        queue.enqueue("HB_1_2025").await;
        queue.admit("HB_1_2025").await.unwrap();
        let job = queue.get("HB_1_2025").await.unwrap();
        assert_eq!(job.state, JobState::Running);
    }

    #[tokio::test]
    async fn fail_releases_the_liveness_key() {
        let queue = JobQueue::new(FakeKv::default(), 7, Duration::from_millis(1));
        queue.enqueue("HB_1_2025").await;
        queue.admit("HB_1_2025").await.unwrap();
        queue
            .fail("HB_1_2025", ErrorKind::EmptyBill, "no documents".to_string())
            .await
            .unwrap();

        let job = queue.get("HB_1_2025").await.unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_kind, Some(ErrorKind::EmptyBill));

        // A successor can now be admitted without blocking on capacity.
        queue.enqueue("HB_2_2025").await;
        queue.admit("HB_2_2025").await.unwrap();
        assert_eq!(
            queue.get("HB_2_2025").await.unwrap().state,
            JobState::Running
        );
    }

    #[tokio::test]
    async fn admission_gate_blocks_at_capacity_until_a_slot_frees() {
        let queue = std::sync::Arc::new(JobQueue::new(FakeKv::default(), 1, Duration::from_millis(5)));
        queue.enqueue("HB_1_2025").await;
        queue.admit("HB_1_2025").await.unwrap();

        queue.enqueue("HB_2_2025").await;
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.admit("HB_2_2025").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second job must not admit while at capacity");

        queue.complete("HB_1_2025").await.unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(
            queue.get("HB_2_2025").await.unwrap().state,
            JobState::Running
        );
    }
}
