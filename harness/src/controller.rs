//! Benchmark controller: drives one run of samples for a chosen strategy.
//!
//! ## Lifecycle
//!
//! ```text
//! start_run(config, progress)
//!   → validate config            : ConfigurationError, nothing invoked
//!   → reset board                : all strategies if params changed, else only this one
//!   → for i in 0..sample_count:
//!       sampler.run(strategy)    : the only await point
//!       record sample on board
//!       publish RunSnapshot      : non-blocking
//!   → RunResult (len == sample_count)
//! ```
//!
//! Runs are strictly serial and always run to completion: there is no
//! cancellation and no timeout. A hung adapter stalls the run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::ConfigurationError;
use crate::sampler::{Sample, SampleRunner};
use crate::strategy::{QueryStrategy, StrategyId, MAX_REPETITIONS, MIN_REPETITIONS};

/// Parameters of one run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub strategy: StrategyId,
    pub queries_per_sample: u32,
    pub sample_count: usize,
}

impl RunConfiguration {
    pub fn new(strategy: impl Into<StrategyId>, queries_per_sample: u32, sample_count: usize) -> Self {
        Self {
            strategy: strategy.into(),
            queries_per_sample,
            sample_count,
        }
    }

    fn params(&self) -> RunParams {
        RunParams {
            queries_per_sample: self.queries_per_sample,
            sample_count: self.sample_count,
        }
    }
}

/// The part of a configuration that must match for series to be comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub queries_per_sample: u32,
    pub sample_count: usize,
}

/// Ordered samples of one run. Index `i` is attempt `i + 1`; gaps are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub strategy: StrategyId,
    pub queries_per_sample: u32,
    pub sample_count: usize,
    pub samples: Vec<Option<Sample>>,
    pub first_invocation_was_cold: bool,
}

impl RunResult {
    fn empty(config: &RunConfiguration) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            strategy: config.strategy.clone(),
            queries_per_sample: config.queries_per_sample,
            sample_count: config.sample_count,
            samples: Vec::with_capacity(config.sample_count),
            first_invocation_was_cold: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() == self.sample_count
    }

    pub fn failed_samples(&self) -> usize {
        self.samples.iter().filter(|s| s.is_none()).count()
    }
}

/// Partial result published after each iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Zero-based index of the iteration that just finished.
    pub iteration: usize,
    pub result: RunResult,
}

/// Results accumulated across runs, one series per strategy.
///
/// Series are kept in the order strategies were first run so report columns
/// stay put across reruns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunBoard {
    last_params: Option<RunParams>,
    series: Vec<RunResult>,
}

impl RunBoard {
    pub fn series(&self) -> &[RunResult] {
        &self.series
    }

    pub fn get(&self, id: &StrategyId) -> Option<&RunResult> {
        self.series.iter().find(|r| &r.strategy == id)
    }

    pub fn last_params(&self) -> Option<RunParams> {
        self.last_params
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Prepare the board for a new run of `config`, returning the index of
    /// its (now empty) series.
    fn begin(&mut self, config: &RunConfiguration) -> usize {
        let params = config.params();
        if self.last_params != Some(params) {
            if !self.series.is_empty() {
                info!(
                    cleared = self.series.len(),
                    queries_per_sample = params.queries_per_sample,
                    sample_count = params.sample_count,
                    "run parameters changed; clearing all series"
                );
            }
            self.series.clear();
            self.last_params = Some(params);
        }

        let fresh = RunResult::empty(config);
        match self.series.iter().position(|r| r.strategy == config.strategy) {
            Some(slot) => {
                debug!(strategy = %config.strategy, "rerun; replacing previous series");
                self.series[slot] = fresh;
                slot
            }
            None => {
                self.series.push(fresh);
                self.series.len() - 1
            }
        }
    }
}

/// Orchestrates serial sample runs and keeps the board of results.
pub struct BenchmarkController {
    runner: SampleRunner,
    strategies: HashMap<StrategyId, Arc<dyn QueryStrategy>>,
    board: RunBoard,
}

impl BenchmarkController {
    pub fn new(runner: SampleRunner) -> Self {
        Self {
            runner,
            strategies: HashMap::new(),
            board: RunBoard::default(),
        }
    }

    /// Register an adapter under its own id. A later registration with the
    /// same id replaces the earlier one.
    pub fn register(&mut self, strategy: Arc<dyn QueryStrategy>) {
        let id = strategy.id();
        if self.strategies.insert(id.clone(), strategy).is_some() {
            warn!(strategy = %id, "strategy re-registered; replacing adapter");
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn QueryStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Registered ids, sorted.
    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        let mut ids: Vec<_> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn board(&self) -> &RunBoard {
        &self.board
    }

    pub fn validate(&self, config: &RunConfiguration) -> Result<(), ConfigurationError> {
        if config.strategy.is_empty() {
            return Err(ConfigurationError::NoStrategy);
        }
        if !(MIN_REPETITIONS..=MAX_REPETITIONS).contains(&config.queries_per_sample) {
            return Err(ConfigurationError::QueriesOutOfRange {
                got: config.queries_per_sample,
                min: MIN_REPETITIONS,
                max: MAX_REPETITIONS,
            });
        }
        if config.sample_count == 0 {
            return Err(ConfigurationError::EmptyRun);
        }
        if !self.strategies.contains_key(&config.strategy) {
            return Err(ConfigurationError::UnknownStrategy(config.strategy.clone()));
        }
        Ok(())
    }

    /// Run `config` to completion, publishing a snapshot after every sample.
    ///
    /// A dropped `progress` receiver does not stop the run.
    pub async fn start_run(
        &mut self,
        config: RunConfiguration,
        progress: mpsc::UnboundedSender<RunSnapshot>,
    ) -> Result<RunResult, ConfigurationError> {
        self.validate(&config)?;
        let strategy = match self.strategies.get(&config.strategy) {
            Some(strategy) => Arc::clone(strategy),
            None => return Err(ConfigurationError::UnknownStrategy(config.strategy.clone())),
        };

        let slot = self.board.begin(&config);
        info!(
            strategy = %config.strategy,
            queries_per_sample = config.queries_per_sample,
            sample_count = config.sample_count,
            "run starting"
        );

        let mut receiver_gone = false;
        for iteration in 0..config.sample_count {
            let sample = self
                .runner
                .run(strategy.as_ref(), config.queries_per_sample)
                .await;

            let result = &mut self.board.series[slot];
            if iteration == 0 {
                if let Some(first) = &sample {
                    result.first_invocation_was_cold = first.invocation_is_cold;
                }
            }
            result.samples.push(sample);

            let snapshot = RunSnapshot {
                iteration,
                result: result.clone(),
            };
            if progress.send(snapshot).is_err() && !receiver_gone {
                debug!(strategy = %config.strategy, "progress receiver dropped; continuing run");
                receiver_gone = true;
            }
        }

        let result = self.board.series[slot].clone();

        info!(
            strategy = %config.strategy,
            samples = result.samples.len(),
            failed = result.failed_samples(),
            first_cold = result.first_invocation_was_cold,
            "run complete"
        );
        Ok(result)
    }

    /// Run `config` without observing progress.
    pub async fn run_to_completion(
        &mut self,
        config: RunConfiguration,
    ) -> Result<RunResult, ConfigurationError> {
        let (tx, _rx) = mpsc::unbounded_channel();
        self.start_run(config, tx).await
    }
}
