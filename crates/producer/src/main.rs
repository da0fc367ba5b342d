//! `telq-producer` -- enqueue jobs into the shared work queue.
//!
//! Builds `--count` job records from a description template (`{id}` is
//! substituted with each assigned id), appends them to the configured
//! backend in one atomic batch, and prints the assigned ids.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default              | Description                          |
//! |---------------------|----------|----------------------|--------------------------------------|
//! | `TELQ_BACKEND`      | no       | `file`               | `file` or `sqlite`                   |
//! | `TELQ_QUEUE_FILE`   | no       | `jobs_queue.csv`     | Record file path (file backend)      |
//! | `TELQ_DATABASE_URL` | no       | `sqlite://jobs_queue.db` | Database URL (sqlite backend)    |

use clap::Parser;
use telq_core::{clock, template};
use telq_store::{JobStatus, NewJob, Store, StoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "telq-producer")]
#[command(version)]
#[command(about = "Adds new jobs to the shared work queue")]
struct Args {
    /// Number of jobs to enqueue.
    #[arg(long, default_value_t = 1)]
    count: i64,

    /// Description template; `{id}` is replaced with the assigned job id.
    #[arg(long)]
    description: Option<String>,

    /// Status assigned to new jobs: pending, in_progress, or done.
    #[arg(long, default_value = "pending", value_parser = parse_status)]
    status: JobStatus,
}

fn parse_status(value: &str) -> Result<JobStatus, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telq_producer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    template::validate_job_count(args.count)?;
    let count = args.count as usize;
    let template = args
        .description
        .unwrap_or_else(|| template::DEFAULT_DESCRIPTION_TEMPLATE.to_string());
    let status = args.status;

    let config = StoreConfig::from_env()?;
    let store = Store::connect(&config).await?;

    let ids = store
        .create_jobs(count, |id| {
            let timestamp = clock::utc_now();
            NewJob {
                status,
                created_at: timestamp,
                updated_at: timestamp,
                description: template::render_description(&template, id),
            }
        })
        .await?;

    tracing::debug!(count = ids.len(), queue = %config.backend, "Batch enqueued");

    let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    println!(
        "Created {} job(s) in {}: {}",
        ids.len(),
        config.backend,
        rendered.join(", ")
    );
    Ok(())
}
