//! Workload configuration for the file benchmark
//!
//! A [`WorkloadConfig`] is built once through [`WorkloadConfigBuilder`], which
//! validates every field, and is never mutated afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{BenchError, Result};

/// Largest operation size accepted by the file benchmark (16 MiB)
pub const MAX_OP_SIZE: u64 = 16 * 1024 * 1024;

/// Default target file of the file benchmark
pub const DEFAULT_TARGET: &str = "diskperf.data";

/// Granularity that sizes and offsets must respect under `O_DIRECT`
pub const DIRECT_IO_BLOCK: u64 = 512;

/// Read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Write,
}

/// Sequential cursor or random offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPattern {
    Sequential,
    Random,
}

/// Whether every operation is followed by `fsync()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityMode {
    None,
    PerOperation,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Read => write!(f, "READ"),
            OperationKind::Write => write!(f, "WRITE"),
        }
    }
}

impl fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPattern::Sequential => write!(f, "SEQ"),
            AccessPattern::Random => write!(f, "RANDOM"),
        }
    }
}

/// Render a boolean switch the way the report line does
pub(crate) fn switch_str(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// Validated, immutable parameters of one file benchmark run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadConfig {
    operation_size: u64,
    operation_count: u64,
    operation_kind: OperationKind,
    access_pattern: AccessPattern,
    durability_mode: DurabilityMode,
    alignment: u64,
    target: PathBuf,
    sync_open: bool,
    direct_io: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefill: Option<u64>,
}

impl WorkloadConfig {
    /// Start building a configuration for the given target path
    ///
    /// # Example
    /// ```
    /// use sysperf::config::{AccessPattern, OperationKind, WorkloadConfig};
    ///
    /// let config = WorkloadConfig::builder("bench.data")
    ///     .operation_size(512)
    ///     .operation_count(10)
    ///     .operation_kind(OperationKind::Write)
    ///     .access_pattern(AccessPattern::Random)
    ///     .alignment(512)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.bytes_to_transfer(), 5120);
    /// ```
    pub fn builder(target: impl Into<PathBuf>) -> WorkloadConfigBuilder {
        WorkloadConfigBuilder::new(target)
    }

    pub fn operation_size(&self) -> u64 {
        self.operation_size
    }

    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    pub fn operation_kind(&self) -> OperationKind {
        self.operation_kind
    }

    pub fn access_pattern(&self) -> AccessPattern {
        self.access_pattern
    }

    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }

    pub fn alignment(&self) -> u64 {
        self.alignment
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sync_open(&self) -> bool {
        self.sync_open
    }

    pub fn direct_io(&self) -> bool {
        self.direct_io
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn prefill(&self) -> Option<u64> {
        self.prefill
    }

    /// Write + Sequential runs append to a truncated target
    pub fn is_append(&self) -> bool {
        self.operation_kind == OperationKind::Write
            && self.access_pattern == AccessPattern::Sequential
    }

    /// Total bytes the run moves, saturating on overflow
    pub fn bytes_to_transfer(&self) -> u64 {
        self.operation_size.saturating_mul(self.operation_count)
    }
}

impl fmt::Display for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OP: {} SIZE: {} NUM: {} ACCESS: {} FSYNC: {} SYNC: {} ALIGN: {}",
            self.operation_kind,
            self.operation_size,
            self.operation_count,
            self.access_pattern,
            switch_str(self.durability_mode == DurabilityMode::PerOperation),
            switch_str(self.sync_open),
            self.alignment
        )
    }
}

/// Builder for [`WorkloadConfig`]; validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct WorkloadConfigBuilder {
    operation_size: u64,
    operation_count: u64,
    operation_kind: OperationKind,
    access_pattern: AccessPattern,
    durability_mode: DurabilityMode,
    alignment: u64,
    target: PathBuf,
    sync_open: bool,
    direct_io: bool,
    seed: Option<u64>,
    prefill: Option<u64>,
    max_operation_size: u64,
}

impl Default for WorkloadConfigBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl WorkloadConfigBuilder {
    fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            operation_size: 4096,
            operation_count: 128 * 1024,
            operation_kind: OperationKind::Read,
            access_pattern: AccessPattern::Sequential,
            durability_mode: DurabilityMode::None,
            alignment: 1,
            target: target.into(),
            sync_open: false,
            direct_io: false,
            seed: None,
            prefill: None,
            max_operation_size: MAX_OP_SIZE,
        }
    }

    pub fn operation_size(mut self, bytes: u64) -> Self {
        self.operation_size = bytes;
        self
    }

    pub fn operation_count(mut self, count: u64) -> Self {
        self.operation_count = count;
        self
    }

    pub fn operation_kind(mut self, kind: OperationKind) -> Self {
        self.operation_kind = kind;
        self
    }

    pub fn access_pattern(mut self, pattern: AccessPattern) -> Self {
        self.access_pattern = pattern;
        self
    }

    pub fn durability_mode(mut self, mode: DurabilityMode) -> Self {
        self.durability_mode = mode;
        self
    }

    pub fn alignment(mut self, bytes: u64) -> Self {
        self.alignment = bytes;
        self
    }

    pub fn sync_open(mut self, on: bool) -> Self {
        self.sync_open = on;
        self
    }

    pub fn direct_io(mut self, on: bool) -> Self {
        self.direct_io = on;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn prefill(mut self, bytes: Option<u64>) -> Self {
        self.prefill = bytes;
        self
    }

    /// Lower the operation size ceiling (the append preset caps it at 1 MiB)
    pub fn max_operation_size(mut self, bytes: u64) -> Self {
        self.max_operation_size = bytes.min(MAX_OP_SIZE);
        self
    }

    /// O_DIRECT rejects transfers whose size or offset is not block-aligned
    fn check_direct_io(&self) -> Result<()> {
        let unaligned = |v: u64| v % DIRECT_IO_BLOCK != 0;
        if unaligned(self.operation_size) {
            return Err(BenchError::invalid(format!(
                "direct I/O needs an op size that is a multiple of {}, got {}",
                DIRECT_IO_BLOCK, self.operation_size
            )));
        }
        if self.access_pattern == AccessPattern::Random && unaligned(self.alignment) {
            return Err(BenchError::invalid(format!(
                "direct I/O needs an alignment that is a multiple of {}, got {}",
                DIRECT_IO_BLOCK, self.alignment
            )));
        }
        if let Some(bytes) = self.prefill.filter(|&b| unaligned(b)) {
            return Err(BenchError::invalid(format!(
                "direct I/O needs a prefill size that is a multiple of {}, got {}",
                DIRECT_IO_BLOCK, bytes
            )));
        }
        Ok(())
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<WorkloadConfig> {
        if self.operation_size == 0 || self.operation_size > self.max_operation_size {
            return Err(BenchError::invalid(format!(
                "op size must be in [1, {}], got {}",
                self.max_operation_size, self.operation_size
            )));
        }

        if self.alignment == 0 {
            return Err(BenchError::invalid("alignment must be >= 1, got 0"));
        }

        if self.target.as_os_str().is_empty() {
            return Err(BenchError::invalid("target path is empty"));
        }

        let appends = self.operation_kind == OperationKind::Write
            && self.access_pattern == AccessPattern::Sequential;
        if appends && self.prefill.is_some() {
            return Err(BenchError::invalid(
                "prefill does not apply to sequential writes: the target is truncated",
            ));
        }

        if self.direct_io {
            self.check_direct_io()?;
        }

        Ok(WorkloadConfig {
            operation_size: self.operation_size,
            operation_count: self.operation_count,
            operation_kind: self.operation_kind,
            access_pattern: self.access_pattern,
            durability_mode: self.durability_mode,
            alignment: self.alignment,
            target: self.target,
            sync_open: self.sync_open,
            direct_io: self.direct_io,
            seed: self.seed,
            prefill: self.prefill,
        })
    }
}
