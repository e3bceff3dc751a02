//! Run results and their text/JSON rendering
//!
//! The rate derivations are integer arithmetic:
//! - `bps = bytes * 1_000_000 / elapsed_us`
//! - `iops = operations * 1_000_000 / elapsed_us`
//!
//! A zero elapsed time leaves both rates undefined instead of dividing by zero.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// Output format for benchmark reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable report line (default)
    Text,
    /// JSON document for machine parsing
    Json,
}

/// Outcome of one timed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub operations: u64,
    pub bytes_transferred: u64,
    pub elapsed_us: u64,
}

impl RunResult {
    pub fn new(operations: u64, bytes_per_operation: u64, elapsed_us: u64) -> Self {
        Self {
            operations,
            bytes_transferred: operations.saturating_mul(bytes_per_operation),
            elapsed_us,
        }
    }

    /// Bytes per second, `None` when the window was too short to measure
    pub fn throughput_bps(&self) -> Option<u64> {
        per_second(self.bytes_transferred, self.elapsed_us)
    }

    /// Operations per second, `None` when the window was too short to measure
    pub fn iops(&self) -> Option<u64> {
        per_second(self.operations, self.elapsed_us)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_us as f64 / 1_000_000.0
    }
}

/// `amount * 1_000_000 / elapsed_us` without intermediate overflow
pub fn per_second(amount: u64, elapsed_us: u64) -> Option<u64> {
    if elapsed_us == 0 {
        return None;
    }
    let rate = u128::from(amount) * 1_000_000 / u128::from(elapsed_us);
    Some(u64::try_from(rate).unwrap_or(u64::MAX))
}

/// Render a rate, or `undefined` for an unmeasurable window
pub fn rate_str(rate: Option<u64>) -> String {
    match rate {
        Some(value) => value.to_string(),
        None => "undefined".to_string(),
    }
}

/// One measured round as it appears in a report
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub elapsed_us: u64,
    pub operations: u64,
    pub bytes_transferred: u64,
    pub bps: Option<u64>,
    pub iops: Option<u64>,
}

impl RoundReport {
    pub fn new(round: usize, result: &RunResult) -> Self {
        Self {
            round,
            elapsed_us: result.elapsed_us,
            operations: result.operations,
            bytes_transferred: result.bytes_transferred,
            bps: result.throughput_bps(),
            iops: result.iops(),
        }
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ELAPSED: {}us BPS: {} IOPS: {}",
            self.elapsed_us,
            rate_str(self.bps),
            rate_str(self.iops)
        )
    }
}

/// Aggregate over several rounds of the same workload
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub rounds: usize,
    pub total_us: u64,
    pub avg_round_us: u64,
    pub operations: u64,
    pub bytes_transferred: u64,
    pub bps: Option<u64>,
    pub iops: Option<u64>,
}

impl SummaryReport {
    pub fn from_results(results: &[RunResult]) -> Self {
        let total_us = results.iter().map(|r| r.elapsed_us).sum::<u64>();
        let operations = results.iter().map(|r| r.operations).sum::<u64>();
        let bytes = results
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.bytes_transferred));
        let avg_round_us = if results.is_empty() {
            0
        } else {
            total_us / results.len() as u64
        };

        Self {
            rounds: results.len(),
            total_us,
            avg_round_us,
            operations,
            bytes_transferred: bytes,
            bps: per_second(bytes, total_us),
            iops: per_second(operations, total_us),
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total_time: {}us avg_round_time: {}us ops: {} bps: {}",
            self.total_us,
            self.avg_round_us,
            rate_str(self.iops),
            rate_str(self.bps)
        )
    }
}

/// Complete report of one benchmark invocation
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport<P> {
    pub version: String,
    pub format: String,
    pub benchmark: &'static str,
    pub parameters: P,
    pub rounds: Vec<RoundReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryReport>,
}

impl<P> BenchmarkReport<P>
where
    P: Serialize + fmt::Display,
{
    /// Build a report; a summary is attached when there is more than one round
    pub fn new(benchmark: &'static str, parameters: P, results: &[RunResult]) -> Self {
        let rounds = results
            .iter()
            .enumerate()
            .map(|(i, r)| RoundReport::new(i, r))
            .collect();
        let summary = (results.len() > 1).then(|| SummaryReport::from_results(results));

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "sysperf-json-v1".to_string(),
            benchmark,
            parameters,
            rounds,
            summary,
        }
    }

    /// Text form: one line for a single round, header + rounds + summary otherwise
    pub fn to_text(&self) -> String {
        if let [only] = self.rounds.as_slice() {
            return format!("{} {}", self.parameters, only);
        }

        let mut out = self.parameters.to_string();
        for round in &self.rounds {
            out.push_str(&format!(
                "\nround({}) time: {}us ops: {} bps: {}",
                round.round,
                round.elapsed_us,
                rate_str(round.iops),
                rate_str(round.bps)
            ));
        }
        if let Some(summary) = &self.summary {
            out.push('\n');
            out.push_str(&summary.to_string());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
        }
    }
}
