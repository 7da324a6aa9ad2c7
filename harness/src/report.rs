//! Text and JSON rendering of a run board.
//!
//! Series are aligned by attempt number so that a gap in one strategy never
//! shifts another strategy's values.

use std::fmt::Write as _;

use serde::Serialize;

use crate::aggregate::{summarize, Metric, Summary};
use crate::controller::{RunBoard, RunParams, RunResult};

const GAP: &str = "-";

/// Settings line shown above each chart.
pub fn settings_line(params: RunParams) -> String {
    let queries = if params.queries_per_sample == 1 {
        "Single query (no waterfall)".to_string()
    } else {
        format!("{} serial queries", params.queries_per_sample)
    };
    format!("Settings: {} • {} samples", queries, params.sample_count)
}

/// One strategy's aggregate line, plus the cold/warm note beneath it.
pub fn summary_lines(result: &RunResult, metric: Metric) -> (String, &'static str) {
    let Summary {
        mean,
        mean_excluding_first,
        count,
    } = summarize(&result.samples, metric);
    let name = result.strategy.display_name();

    let mut line = format!("{name}: {mean:.2}ms avg");
    if result.first_invocation_was_cold && count > 1 {
        let _ = write!(line, " ({mean_excluding_first:.2}ms avg after connecting)");
    }

    let note = if result.first_invocation_was_cold {
        "• Cold start - includes connection establishment"
    } else {
        "• Warm compute - reusing connection pool"
    };
    (line, note)
}

/// Attempt-aligned table for one metric.
pub fn render_metric(board: &RunBoard, metric: Metric) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", metric.title());
    if let Some(params) = board.last_params() {
        let _ = writeln!(out, "{}", settings_line(params));
    }
    if board.is_empty() {
        return out;
    }

    let series = board.series();
    let rows = series.iter().map(|r| r.sample_count).max().unwrap_or(0);
    let widths: Vec<usize> = series
        .iter()
        .map(|r| r.strategy.display_name().len().max(10))
        .collect();

    let _ = write!(out, "{:>8}", "attempt");
    for (result, width) in series.iter().zip(&widths) {
        let _ = write!(out, "  {:>width$}", result.strategy.display_name(), width = width);
    }
    out.push('\n');

    for i in 0..rows {
        let _ = write!(out, "{:>8}", format!("#{}", i + 1));
        for (result, width) in series.iter().zip(&widths) {
            let cell = match result.samples.get(i).copied().flatten() {
                Some(sample) => format!("{:.2}ms", metric.of(&sample)),
                None => GAP.to_string(),
            };
            let _ = write!(out, "  {:>width$}", cell, width = width);
        }
        out.push('\n');
    }

    out.push('\n');
    for result in series {
        let (line, note) = summary_lines(result, metric);
        let _ = writeln!(out, "{line}");
        let _ = writeln!(out, "    {note}");
    }
    out
}

/// Both charts, processing time first.
pub fn render_board(board: &RunBoard) -> String {
    let mut out = render_metric(board, Metric::QueryDuration);
    out.push('\n');
    out.push_str(&render_metric(board, Metric::TotalElapsed));
    out
}

#[derive(Debug, Serialize)]
struct SeriesExport<'a> {
    name: &'a str,
    #[serde(flatten)]
    result: &'a RunResult,
    query_duration: Summary,
    elapsed: Summary,
}

#[derive(Debug, Serialize)]
struct BoardExport<'a> {
    params: Option<RunParams>,
    series: Vec<SeriesExport<'a>>,
}

/// Board plus per-series summaries as pretty JSON.
pub fn board_json(board: &RunBoard) -> serde_json::Result<String> {
    let export = BoardExport {
        params: board.last_params(),
        series: board
            .series()
            .iter()
            .map(|result| SeriesExport {
                name: result.strategy.display_name(),
                result,
                query_duration: summarize(&result.samples, Metric::QueryDuration),
                elapsed: summarize(&result.samples, Metric::TotalElapsed),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&export)
}
