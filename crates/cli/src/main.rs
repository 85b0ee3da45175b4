//! asyncflow CLI - queue pipeline, merge request age aggregator, threshold pollers

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use asyncflow_core::application::pipeline::constants::{
    DEFAULT_CONSUMERS, DEFAULT_PRODUCERS, DEFAULT_SEED,
};
use asyncflow_core::application::polling::DEFAULT_POLLERS;
use asyncflow_core::application::{
    poll_all, MergeRequestAgeAggregator, Pipeline, PipelineConfig, PollConfig,
};
use asyncflow_core::domain::merge_request::{cutoff_before, DEFAULT_PER_PAGE};
use asyncflow_core::domain::{MergeRequestQuery, MergeRequestState};
use asyncflow_core::port::time_provider::SystemTimeProvider;
use asyncflow_core::port::token_source::RandomHexTokens;
use asyncflow_core::port::TimeProvider;
use asyncflow_infra_gitlab::GitLabClient;
use telemetry::LogFormat;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_TIME_UNIT_MS: u64 = 1000;

#[derive(Parser)]
#[command(name = "asyncflow")]
#[command(about = "Async queue pipeline and paginated merge request aggregator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run producers and consumers over a shared queue until it drains
    Queue {
        /// Number of producers
        #[arg(short = 'p', long, default_value_t = DEFAULT_PRODUCERS)]
        nprod: usize,

        /// Number of consumers
        #[arg(short = 'c', long, default_value_t = DEFAULT_CONSUMERS)]
        ncon: usize,

        /// RNG seed for batch sizes and pauses
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Length of one pause unit in milliseconds
        #[arg(long, default_value_t = DEFAULT_TIME_UNIT_MS)]
        time_unit_ms: u64,

        /// Bound the queue (producers wait when it is full)
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Report how many days 99% of a group's merge requests took to close
    MrAges {
        /// GitLab base URL
        #[arg(short, long, env = "GITLAB_URL")]
        url: String,

        /// Private access token
        #[arg(short, long, env = "GITLAB_TOKEN", hide_env_values = true)]
        token: String,

        /// Group id
        #[arg(short, long, env = "GITLAB_GROUP_ID")]
        gid: String,

        /// Merge request state filter
        #[arg(long, default_value = "merged")]
        state: String,

        /// Page size (1-100)
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },

    /// Run concurrent pollers that retry until a random draw clears their threshold
    Threshold {
        /// Number of pollers
        #[arg(short = 'n', long, default_value_t = DEFAULT_POLLERS)]
        tasks: usize,

        /// RNG seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Length of one retry unit in milliseconds
        #[arg(long, default_value_t = DEFAULT_TIME_UNIT_MS)]
        time_unit_ms: u64,

        /// Give up after this many draws
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Dropped last, after any error below has been logged
    let _log_guard = telemetry::init_logging(LogFormat::from_env())?;
    info!("asyncflow v{} starting...", VERSION);

    let start = Instant::now();
    if let Err(e) = run(cli.command).await {
        error!(error = %format!("{:#}", e), "Run failed");
        return Err(e);
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(elapsed_secs = elapsed, "Program completed");
    println!("Program completed in {:0.5} seconds.", elapsed);
    Ok(())
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Queue {
            nprod,
            ncon,
            seed,
            time_unit_ms,
            capacity,
        } => {
            let config = PipelineConfig::new(nprod, ncon)
                .with_time_unit(Duration::from_millis(time_unit_ms))
                .with_capacity(capacity)
                .with_seed(Some(seed));
            let pipeline = Pipeline::new(config, Arc::new(RandomHexTokens::default()))
                .context("Invalid queue settings")?;

            let report = pipeline.run().await.context("Queue pipeline failed")?;
            println!(
                "Produced {} items; consumed {} across {} consumers.",
                report.produced,
                report.consumed,
                report.consumers.len()
            );
        }

        Commands::MrAges {
            url,
            token,
            gid,
            state,
            per_page,
        } => {
            // Cutoff is fixed once, here, for every request of this run
            let now = SystemTimeProvider.now_utc();
            let state: MergeRequestState = state.parse().context("Invalid --state")?;
            let query = MergeRequestQuery::new(gid, state, per_page, cutoff_before(now))
                .context("Invalid merge request query")?;

            let client = GitLabClient::new(&url, token).context("Failed to create GitLab client")?;
            let aggregator = MergeRequestAgeAggregator::new(Arc::new(client));

            let report = aggregator
                .run(&query)
                .await
                .context("Merge request aggregation failed")?;
            println!(
                "99% of total {} MRs took {} days to close",
                report.records, report.percentile_days
            );
        }

        Commands::Threshold {
            tasks,
            seed,
            time_unit_ms,
            max_attempts,
        } => {
            let config = PollConfig {
                pollers: tasks,
                time_unit: Duration::from_millis(time_unit_ms),
                max_attempts,
                seed: Some(seed),
                ..Default::default()
            };

            let outcomes = poll_all(&config).await.context("Threshold polling failed")?;
            println!();
            let line = outcomes
                .iter()
                .map(|o| format!("r{}: {}", o.idx + 1, o.value))
                .collect::<Vec<_>>()
                .join(", ");
            println!("{}", line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_queue_defaults() {
        let cli = Cli::try_parse_from(["asyncflow", "queue"]).unwrap();
        match cli.command {
            Commands::Queue {
                nprod,
                ncon,
                seed,
                capacity,
                ..
            } => {
                assert_eq!(nprod, 5);
                assert_eq!(ncon, 10);
                assert_eq!(seed, 444);
                assert_eq!(capacity, None);
            }
            _ => panic!("expected queue command"),
        }
    }

    #[test]
    fn test_mr_ages_flags() {
        let cli = Cli::try_parse_from([
            "asyncflow",
            "mr-ages",
            "-u",
            "https://gitlab.example.com",
            "-t",
            "tok",
            "-g",
            "12",
        ])
        .unwrap();
        match cli.command {
            Commands::MrAges {
                url,
                gid,
                state,
                per_page,
                ..
            } => {
                assert_eq!(url, "https://gitlab.example.com");
                assert_eq!(gid, "12");
                assert_eq!(state, "merged");
                assert_eq!(per_page, 50);
            }
            _ => panic!("expected mr-ages command"),
        }
    }
}
