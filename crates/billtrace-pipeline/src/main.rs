use anyhow::Context;
use billtrace_config::Config;
use billtrace_llm::{HttpEmbeddingClient, HttpLlmClient};
use billtrace_models::BillId;
use billtrace_queue::{JobQueue, RedisKvStore};
use clap::Parser;

/// Top-level CLI: the shared [`Config`] plus the bills to run this
/// invocation, e.g. `billtrace HB_1483_2025 SB_42_2025`.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(flatten)]
    config: Config,

    /// Bill identifiers to process, in `{chamber}B_{number}_{year}` form.
    #[clap(required = true)]
    bills: Vec<BillId>,
}

fn main() -> Result<(), anyhow::Error> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(!matches!(std::env::var("NO_COLOR"), Ok(v) if v == "1"))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(bills = ?args.bills, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let task = runtime.spawn(async move { async_main(args).await });
    let result = runtime.block_on(task);

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(args: Args) -> Result<(), anyhow::Error> {
    let Args { config, bills } = args;

    let http = reqwest::Client::new();
    let llm = HttpLlmClient::new(http.clone(), config.llm_endpoint.clone());
    let embed = HttpEmbeddingClient::new(http, config.embed_endpoint.clone());

    let kv = RedisKvStore::connect(&config.kv_address)
        .await
        .context("connecting to the KV liveness store")?;
    let queue = std::sync::Arc::new(JobQueue::new(
        kv,
        config.max_concurrent_jobs,
        config.dequeue_interval(),
    ));

    let mut runs = tokio::task::JoinSet::new();
    for bill in bills {
        queue.enqueue(&bill.canonical()).await;

        let queue = queue.clone();
        let llm = llm.clone();
        let embed = embed.clone();
        let config = config.clone();
        runs.spawn(async move {
            queue
                .admit(&bill.canonical())
                .await
                .context("admitting job onto the queue")?;
            billtrace_pipeline::run_bill(&config, &queue, &llm, &embed, &bill)
                .await
                .map_err(anyhow::Error::from)
        });
    }

    let mut failures = 0usize;
    while let Some(outcome) = runs.join_next().await {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(%err, "bill run failed");
                failures += 1;
            }
            Err(join_err) => {
                tracing::error!(%join_err, "bill run panicked");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} bill run(s) failed");
    }
    Ok(())
}
