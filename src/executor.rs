//! The timed read/write loop of the file benchmark
//!
//! Exactly `op_num` transfers of `op_size` bytes each, out of one buffer
//! allocated before the loop. A short transfer is fatal and never retried;
//! with per-operation durability every transfer is followed by `fsync()`.

use std::io;

use memmap2::MmapMut;

use crate::config::{DurabilityMode, OperationKind, WorkloadConfig};
use crate::error::{BenchError, Result};
use crate::harness::Workload;
use crate::offset::OffsetGenerator;
use crate::target::FILL_PATTERN;

/// Minimal storage surface the executor drives
///
/// Each method maps to one system call so a test double can count them.
pub trait IoTarget {
    fn seek_to(&mut self, offset: u64) -> io::Result<u64>;
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize>;
    fn sync(&mut self) -> io::Result<()>;
}

/// Drives one run of the file benchmark against an owned target
pub struct Executor<T> {
    target: T,
    offsets: OffsetGenerator,
    /// Page-aligned, sized once to the operation size
    buffer: MmapMut,
    operation_count: u64,
    kind: OperationKind,
    durability: DurabilityMode,
}

impl<T: IoTarget> Executor<T> {
    pub fn new(config: &WorkloadConfig, target: T, offsets: OffsetGenerator) -> Result<Self> {
        let size = usize::try_from(config.operation_size())
            .map_err(|_| BenchError::invalid("op size does not fit in memory"))?;
        let mut buffer =
            MmapMut::map_anon(size).map_err(|e| BenchError::unavailable("I/O buffer", e))?;
        buffer.fill(FILL_PATTERN);

        Ok(Self {
            target,
            offsets,
            buffer,
            operation_count: config.operation_count(),
            kind: config.operation_kind(),
            durability: config.durability_mode(),
        })
    }

    /// Give the target back (dropping it closes a file target)
    pub fn into_target(self) -> T {
        self.target
    }

    #[inline]
    fn operate_once(&mut self) -> Result<()> {
        if let Some(offset) = self.offsets.next_offset() {
            self.target
                .seek_to(offset)
                .map_err(|source| BenchError::SeekFailure { offset, source })?;
        }

        let expected = self.buffer.len();
        let transferred = match self.kind {
            OperationKind::Read => self.target.read_some(&mut self.buffer[..]),
            OperationKind::Write => self.target.write_some(&self.buffer[..]),
        }
        .map_err(|source| BenchError::TransferFailure {
            kind: self.kind,
            source,
        })?;

        if transferred != expected {
            return Err(BenchError::IncompleteTransfer {
                kind: self.kind,
                expected,
                actual: transferred,
            });
        }

        if self.durability == DurabilityMode::PerOperation {
            self.target.sync().map_err(BenchError::FlushFailure)?;
        }
        Ok(())
    }
}

impl<T: IoTarget> Workload for Executor<T> {
    fn name(&self) -> &'static str {
        "file"
    }

    fn operation_count(&self) -> u64 {
        self.operation_count
    }

    fn bytes_per_operation(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn execute(&mut self) -> Result<()> {
        for _ in 0..self.operation_count {
            self.operate_once()?;
        }
        Ok(())
    }
}
