//! File benchmark engine: setup, timed loop, teardown
//!
//! ```text
//! config -> BenchmarkTarget::open -> OffsetGenerator -> Executor
//!        -> measure (timed) -> drop target -> RunResult
//! ```

use std::path::PathBuf;

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::config::{DurabilityMode, OperationKind, WorkloadConfig};
use crate::error::{BenchError, Result};
use crate::executor::Executor;
use crate::harness::measure;
use crate::offset::OffsetGenerator;
use crate::report::RunResult;
use crate::target::BenchmarkTarget;

/// Largest write accepted by the append preset (1 MiB)
pub const MAX_APPEND_WRITE: u64 = 1024 * 1024;

/// Default target of the append preset
pub const DEFAULT_APPEND_TARGET: &str = "diskperf.out";

/// Run one file benchmark end to end
///
/// The target is released before this returns, whether the run succeeded or not.
pub fn run_file_benchmark(config: &WorkloadConfig) -> Result<RunResult> {
    info!("file benchmark: {}", config);

    let target = BenchmarkTarget::open(config)?;
    let offsets = OffsetGenerator::for_workload(config, target.extent())?;
    let mut executor = Executor::new(config, target, offsets)?;

    let result = measure(&mut executor);
    drop(executor);
    result
}

/// Append-throughput preset: fixed-size writes until a byte total is reached
#[derive(Debug, Clone, Serialize)]
pub struct AppendConfig {
    pub write_size: u64,
    pub write_total: u64,
    pub fsync_each: bool,
    pub target: PathBuf,
}

impl Default for AppendConfig {
    fn default() -> Self {
        Self {
            write_size: 4096,
            write_total: 1024 * 1024 * 1024,
            fsync_each: false,
            target: PathBuf::from(DEFAULT_APPEND_TARGET),
        }
    }
}

impl AppendConfig {
    /// Number of writes: the total rounded up to whole writes
    pub fn write_count(&self) -> u64 {
        if self.write_size == 0 {
            return 0;
        }
        self.write_total.div_ceil(self.write_size)
    }

    /// Resolve to a Write + Sequential workload
    pub fn to_workload(&self) -> Result<WorkloadConfig> {
        if self.write_size == 0 || self.write_size > MAX_APPEND_WRITE {
            return Err(BenchError::invalid(format!(
                "invalid write size ({})",
                self.write_size
            )));
        }

        let durability = if self.fsync_each {
            DurabilityMode::PerOperation
        } else {
            DurabilityMode::None
        };

        WorkloadConfig::builder(&self.target)
            .max_operation_size(MAX_APPEND_WRITE)
            .operation_kind(OperationKind::Write)
            .operation_size(self.write_size)
            .operation_count(self.write_count())
            .durability_mode(durability)
            .build()
    }
}

impl fmt::Display for AppendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file append test: SIZE: {} TOTAL: {} FSYNC: {}",
            self.write_size,
            self.write_total,
            crate::config::switch_str(self.fsync_each)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessPattern;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_append_write_count_rounds_up() {
        let config = AppendConfig {
            write_size: 4096,
            write_total: 4097,
            ..Default::default()
        };
        assert_eq!(config.write_count(), 2);
    }

    #[test]
    fn test_append_rejects_large_writes() {
        let config = AppendConfig {
            write_size: MAX_APPEND_WRITE + 1,
            ..Default::default()
        };
        assert!(config.to_workload().is_err());

        let config = AppendConfig {
            write_size: 0,
            ..Default::default()
        };
        assert!(config.to_workload().is_err());
    }

    #[test]
    fn test_append_resolves_to_sequential_write() {
        let config = AppendConfig {
            write_size: 512,
            write_total: 2048,
            fsync_each: true,
            ..Default::default()
        };
        let workload = config.to_workload().unwrap();
        assert!(workload.is_append());
        assert_eq!(workload.operation_count(), 4);
        assert_eq!(workload.durability_mode(), DurabilityMode::PerOperation);
    }

    #[test]
    fn test_run_sequential_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out");
        fs::write(&path, vec![1u8; 12345]).unwrap();

        let config = WorkloadConfig::builder(&path)
            .operation_kind(OperationKind::Write)
            .operation_size(4096)
            .operation_count(1000)
            .build()
            .unwrap();
        let result = run_file_benchmark(&config).unwrap();

        assert_eq!(result.bytes_transferred, 4_096_000);
        assert_eq!(fs::metadata(&path).unwrap().len(), 4_096_000);
    }

    #[test]
    fn test_run_random_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in");
        fs::write(&path, vec![0u8; 4096]).unwrap();

        let config = WorkloadConfig::builder(&path)
            .operation_size(512)
            .operation_count(10)
            .access_pattern(AccessPattern::Random)
            .alignment(512)
            .seed(Some(42))
            .build()
            .unwrap();
        let result = run_file_benchmark(&config).unwrap();
        assert_eq!(result.operations, 10);
        assert_eq!(result.bytes_transferred, 5120);
    }

    #[test]
    fn test_run_random_write_keeps_extent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rw");
        fs::write(&path, vec![0u8; 8192]).unwrap();

        let config = WorkloadConfig::builder(&path)
            .operation_kind(OperationKind::Write)
            .access_pattern(AccessPattern::Random)
            .operation_size(1024)
            .operation_count(50)
            .alignment(1024)
            .build()
            .unwrap();
        run_file_benchmark(&config).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 8192);
    }

    #[test]
    fn test_run_setup_failure_reports_extent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small");
        fs::write(&path, vec![0u8; 10]).unwrap();

        let config = WorkloadConfig::builder(&path)
            .access_pattern(AccessPattern::Random)
            .build()
            .unwrap();
        assert!(matches!(
            run_file_benchmark(&config),
            Err(BenchError::InsufficientExtent { .. })
        ));
    }
}
