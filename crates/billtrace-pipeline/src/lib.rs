//! Orchestrates the acquisition-through-attribution pipeline (spec.md §5)
//! across bills, bounded by [`billtrace_queue::JobQueue`]'s admission gate.

mod convert;
mod run;

use billtrace_config::Config;
use billtrace_llm::{EmbeddingClient, LlmClient};
use billtrace_models::{BillId, PipelineError};
use billtrace_queue::{JobQueue, KvStore};
use tracing::{error, info, instrument};

/// Runs one bill end to end, enforcing the job-wide time budget (spec.md
/// §5: 3600s default) and recording the outcome — success, a specific
/// [`PipelineError`], or a budget timeout — on the queue's job record.
#[instrument(skip(config, queue, llm, embed), fields(bill = %bill))]
pub async fn run_bill<K: KvStore>(
    config: &Config,
    queue: &JobQueue<K>,
    llm: &impl LlmClient,
    embed: &impl EmbeddingClient,
    bill: &BillId,
) -> Result<(), PipelineError> {
    let bill_str = bill.canonical();

    let outcome = tokio::time::timeout(
        config.job_timeout(),
        run::run_bill_inner(config, queue, llm, embed, bill),
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout {
            bill: bill_str.clone(),
        }),
    };

    match &result {
        Ok(()) => {
            info!("job completed");
            let _ = queue.complete(&bill_str).await;
        }
        Err(err) => {
            error!(%err, "job failed");
            let _ = queue.fail(&bill_str, err.kind(), err.to_string()).await;
        }
    }

    result
}
