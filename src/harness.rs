//! The shared benchmark harness
//!
//! Every benchmark is a [`Workload`]: setup happens while building it, the
//! timed window covers exactly [`Workload::execute`], and teardown happens when
//! it is dropped. Swapping the workload swaps the operation primitive (file
//! transfers, pointer chasing, page touching, hash-map operations) while the
//! timing and reporting stay identical.

use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::report::RunResult;
use crate::timer::Stopwatch;

/// One benchmark's operation loop
pub trait Workload {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Operations performed by one call to [`execute`](Self::execute)
    fn operation_count(&self) -> u64;

    /// Bytes each operation moves
    fn bytes_per_operation(&self) -> u64;

    /// Run the timed loop once
    fn execute(&mut self) -> Result<()>;
}

/// Time one execution of `workload`
///
/// Only `execute` is inside the window. An error aborts the measurement and
/// no result is produced.
pub fn measure<W: Workload + ?Sized>(workload: &mut W) -> Result<RunResult> {
    let mut watch = Stopwatch::new();
    info!(
        "{}: starting {} operations",
        workload.name(),
        workload.operation_count()
    );

    watch.start();
    workload.execute()?;
    watch.stop();

    let elapsed_us = watch.elapsed_micros().unwrap_or_default();
    let result = RunResult::new(
        workload.operation_count(),
        workload.bytes_per_operation(),
        elapsed_us,
    );
    info!("{}: finished in {}us", workload.name(), elapsed_us);
    Ok(result)
}

/// Measure `rounds` executions, rebuilding the workload when `fresh` is set
///
/// `build` runs outside the timed window.
pub fn measure_rounds<W, F>(rounds: usize, fresh: bool, mut build: F) -> Result<Vec<RunResult>>
where
    W: Workload,
    F: FnMut() -> Result<W>,
{
    let mut results = Vec::with_capacity(rounds);
    let mut workload = build()?;
    for round in 0..rounds {
        if fresh && round > 0 {
            // drop the old workload before building its replacement
            drop(workload);
            workload = build()?;
        }
        debug!("round {}", round);
        results.push(measure(&mut workload)?);
    }
    Ok(results)
}

/// Bind the current process to one CPU
pub fn pin_to_cpu(cpu: usize) -> Result<()> {
    let mut set = CpuSet::new();
    set.set(cpu)
        .map_err(|e| BenchError::invalid(format!("cpu {} out of range: {}", cpu, e)))?;
    sched_setaffinity(Pid::from_raw(0), &set)
        .map_err(|e| BenchError::unavailable(format!("cpu {}", cpu), e.into()))?;
    debug!("pinned to cpu {}", cpu);
    Ok(())
}
