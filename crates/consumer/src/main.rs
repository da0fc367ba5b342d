//! `telq-consumer` -- claim and execute jobs from the shared work queue.
//!
//! Runs an infinite poll loop: reserve one pending job, simulate its
//! execution for `--work-duration` seconds, mark it done, repeat. When no
//! job is available it sleeps `--poll-interval` seconds between checks.
//! SIGINT/SIGTERM stop the loop between iterations; an in-flight
//! reserve/work/complete cycle always runs to completion so no job is left
//! claimed by a clean shutdown.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default              | Description                          |
//! |---------------------|----------|----------------------|--------------------------------------|
//! | `TELQ_BACKEND`      | no       | `file`               | `file` or `sqlite`                   |
//! | `TELQ_QUEUE_FILE`   | no       | `jobs_queue.csv`     | Record file path (file backend)      |
//! | `TELQ_DATABASE_URL` | no       | `sqlite://jobs_queue.db` | Database URL (sqlite backend)    |

use std::time::Duration;

use clap::Parser;
use telq_core::template;
use telq_store::{CompleteOutcome, Store, StoreConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "telq-consumer")]
#[command(version)]
#[command(about = "Continuously consumes jobs from the shared work queue")]
struct Args {
    /// Delay between queue checks, in seconds.
    #[arg(long, default_value_t = 5.0)]
    poll_interval: f64,

    /// Simulated job execution time, in seconds.
    #[arg(long, default_value_t = 30.0)]
    work_duration: f64,
}

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received.
fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down after current job");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down after current job");
            }
        }

        token_clone.cancel();
    });

    token
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telq_consumer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    template::validate_positive_seconds("poll-interval", args.poll_interval)?;
    template::validate_positive_seconds("work-duration", args.work_duration)?;
    let poll_interval = Duration::from_secs_f64(args.poll_interval);
    let work_duration = Duration::from_secs_f64(args.work_duration);

    let config = StoreConfig::from_env()?;
    let store = Store::connect(&config).await?;
    let shutdown = install_shutdown_handler();

    tracing::info!(
        queue = %config.backend,
        poll_interval_secs = args.poll_interval,
        work_duration_secs = args.work_duration,
        "Consumer started"
    );

    while !shutdown.is_cancelled() {
        // Shutdown is honored here and during the idle sleep only; an
        // in-flight reserve/work/complete cycle runs to completion.
        let Some(job) = store.reserve_next().await? else {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
            continue;
        };

        tracing::info!(
            job_id = job.id,
            description = %job.description,
            work_duration_secs = args.work_duration,
            "Job in progress"
        );
        tokio::time::sleep(work_duration).await;

        match store.mark_done(job.id).await? {
            CompleteOutcome::Completed => {
                tracing::info!(job_id = job.id, "Job completed and marked as done");
            }
            CompleteOutcome::NotFound => {
                tracing::warn!(job_id = job.id, "Job missing while finishing, skipping");
            }
            CompleteOutcome::InvalidStatus(status) => {
                tracing::warn!(
                    job_id = job.id,
                    status = %status,
                    "Job no longer in progress while finishing, skipping"
                );
            }
        }
    }

    tracing::info!("Consumer stopped");
    Ok(())
}
