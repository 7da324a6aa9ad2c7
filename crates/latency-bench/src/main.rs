use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use latency_bench::cli::{plan_runs, progress_line, Cli, Command, QueryArgs, RunArgs};
use latency_bench::{strategies, BenchConfig};
use latency_harness::{report, BenchmarkController, SampleRunner, StrategyId, WarmthTracker};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Strategies => {
            for id in strategies::ALL {
                let id = StrategyId::new(id);
                println!("{:<10} {}", id, id.display_name());
            }
            Ok(())
        }
        Command::Run(args) => run(cli.config.as_deref(), args).await,
        Command::Query(args) => query(cli.config.as_deref(), args).await,
    }
}

async fn query(config_path: Option<&Path>, args: QueryArgs) -> Result<()> {
    let config = BenchConfig::load(config_path)?;
    let strategy = strategies::build_all(&config)?
        .into_iter()
        .find(|s| s.id().as_str() == args.strategy)
        .with_context(|| format!("unknown strategy '{}'", args.strategy))?;

    let response = strategies::invoke(strategy.as_ref(), args.count)
        .await
        .with_context(|| format!("strategy {} failed", args.strategy))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut config = BenchConfig::load(config_path)?;
    args.apply(&mut config);
    info!(
        queries = config.queries,
        samples = config.samples,
        strategies = ?args.strategies,
        "Latency bench starting"
    );

    let tracker = Arc::new(WarmthTracker::new());
    let mut controller = BenchmarkController::new(SampleRunner::new(tracker));
    for strategy in strategies::build_all(&config)? {
        controller.register(strategy);
    }

    for run_config in plan_runs(&controller, &args, &config)? {
        let id = run_config.strategy.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = async move {
            while let Some(snapshot) = rx.recv().await {
                eprintln!("{}", progress_line(&snapshot));
            }
        };

        let (result, ()) = tokio::join!(controller.start_run(run_config, tx), printer);
        let result = result.with_context(|| format!("cannot run strategy {id}"))?;
        info!(
            strategy = %result.strategy,
            failed = result.failed_samples(),
            cold = result.first_invocation_was_cold,
            "Run finished"
        );
    }

    if args.json {
        println!("{}", report::board_json(controller.board())?);
    } else {
        print!("{}", report::render_board(controller.board()));
    }
    Ok(())
}
