//! Mean latency over a run, with and without its first sample.
//!
//! Absent samples never count as zero; they are dropped before averaging.
//! "Excluding first" drops the first *present* sample, which is the one that
//! carried connection setup when a run started cold.

use serde::{Deserialize, Serialize};

use crate::sampler::Sample;

/// Which timing field to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Time spent inside the adapter.
    QueryDuration,
    /// End-to-end time seen by the runner.
    TotalElapsed,
}

impl Metric {
    pub fn of(self, sample: &Sample) -> f64 {
        match self {
            Self::QueryDuration => sample.query_duration_ms,
            Self::TotalElapsed => sample.total_elapsed_ms,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::QueryDuration => "Latency distribution (processing time)",
            Self::TotalElapsed => "Latency distribution (end-to-end)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub mean_excluding_first: f64,
    /// Number of present samples the means were taken over.
    pub count: usize,
}

pub fn summarize(samples: &[Option<Sample>], metric: Metric) -> Summary {
    let values: Vec<f64> = samples.iter().flatten().map(|s| metric.of(s)).collect();

    let mean = mean_of(&values);
    let mean_excluding_first = if values.len() < 2 {
        mean
    } else {
        mean_of(&values[1..])
    };

    Summary {
        mean,
        mean_excluding_first,
        count: values.len(),
    }
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
