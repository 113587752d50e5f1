//! janitor-cli: drives the cleanup coordinator against an in-memory demo
//! store. `once` runs a single pass and prints the report; `watch` keeps the
//! recurring schedule alive until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use janitor_core::app::{ExecutorConfig, JobCoordinator, RetentionExecutor};
use janitor_core::domain::{AttachmentRef, ScheduleSpec};
use janitor_core::impls::InMemoryAttachmentStore;
use janitor_core::ports::{Clock, LogSink, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "janitor", about = "Deletes stored attachments past a retention threshold")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one cleanup pass now and print the report.
    Once {
        /// The number of days to keep attachments for.
        #[arg(long)]
        days: u32,
    },

    /// Run the recurring schedule until Ctrl-C.
    Watch {
        /// Path to a JSON `ScheduleSpec` file.
        #[arg(long)]
        spec: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = Arc::new(InMemoryAttachmentStore::new());
    seed_demo_store(&store).await;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store_port: Arc<dyn janitor_core::ports::AttachmentStore> = store.clone();
    let executor = RetentionExecutor::new(store_port, Arc::clone(&clock), ExecutorConfig::default());
    let coordinator = JobCoordinator::new(executor, clock, Arc::new(LogSink));

    match cli.command {
        Command::Once { days } => {
            let report = coordinator.run_now(days).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Watch { spec } => {
            let raw = std::fs::read_to_string(&spec)
                .with_context(|| format!("reading {}", spec.display()))?;
            let spec: ScheduleSpec =
                serde_json::from_str(&raw).context("parsing schedule spec")?;

            coordinator.start(spec).await?;
            let status = coordinator.status().await;
            match status.next_deadline {
                Some(deadline) => tracing::info!(%deadline, "watching; Ctrl-C to stop"),
                None => tracing::info!("schedule disabled; Ctrl-C to exit"),
            }

            tokio::signal::ctrl_c().await?;
            coordinator.stop().await;
        }
    }

    Ok(())
}

/// A handful of attachments of varying age, so both subcommands have
/// something to chew on.
async fn seed_demo_store(store: &InMemoryAttachmentStore) {
    let now = Utc::now();
    let seed = [
        ("att-001", 400, 1_048_576),
        ("att-002", 90, 2_048),
        ("att-003", 10, 512),
    ];
    for (id, age_days, size_bytes) in seed {
        store
            .insert(AttachmentRef {
                id: id.to_string(),
                size_bytes,
                created_at: now - Duration::days(age_days),
            })
            .await;
    }
}
