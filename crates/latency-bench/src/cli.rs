//! Command-line surface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use latency_harness::{BenchmarkController, RunConfiguration, RunSnapshot, Sample};

use crate::config::BenchConfig;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML file overriding environment configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one or more strategies and print the latency report.
    Run(RunArgs),
    /// Invoke one strategy once and print its rows and duration as JSON.
    Query(QueryArgs),
    /// List known strategy ids.
    Strategies,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Strategy id to invoke.
    #[arg(long = "strategy", short = 's')]
    pub strategy: String,

    /// Requested serial queries; clamped into 1-5, default 1.
    #[arg(long, short = 'c', allow_negative_numbers = true)]
    pub count: Option<i64>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Strategy id to run; repeat to run several on one board.
    #[arg(long = "strategy", short = 's', required = true)]
    pub strategies: Vec<String>,

    /// Serial queries per sample (1-5).
    #[arg(long, short = 'q')]
    pub queries: Option<u32>,

    /// Samples per run.
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Print the board as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// CLI flags take precedence over everything already loaded.
    pub fn apply(&self, config: &mut BenchConfig) {
        if let Some(queries) = self.queries {
            config.queries = queries;
        }
        if let Some(samples) = self.samples {
            config.samples = samples;
        }
    }
}

/// Build and validate every requested run before any of them starts, so a
/// bad id late in the list cannot abort after earlier runs have finished.
pub fn plan_runs(
    controller: &BenchmarkController,
    args: &RunArgs,
    config: &BenchConfig,
) -> Result<Vec<RunConfiguration>> {
    args.strategies
        .iter()
        .map(|id| {
            let run = RunConfiguration::new(id.as_str(), config.queries, config.samples);
            controller.validate(&run).with_context(|| {
                let registered: Vec<String> = controller
                    .strategy_ids()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                format!(
                    "cannot run strategy '{id}' (registered: {})",
                    registered.join(", ")
                )
            })?;
            Ok(run)
        })
        .collect()
}

/// One live progress line for the sample a snapshot just added.
pub fn progress_line(snapshot: &RunSnapshot) -> String {
    let result = &snapshot.result;
    let prefix = format!(
        "[{}] {}/{}",
        result.strategy,
        snapshot.iteration + 1,
        result.sample_count
    );
    match result.samples.get(snapshot.iteration).copied().flatten() {
        Some(Sample {
            query_duration_ms,
            total_elapsed_ms,
            invocation_is_cold,
            ..
        }) => format!(
            "{prefix}: {query_duration_ms:.2}ms query, {total_elapsed_ms:.2}ms elapsed{}",
            if invocation_is_cold { " (cold)" } else { "" }
        ),
        None => format!("{prefix}: failed"),
    }
}
