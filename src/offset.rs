//! Offset generation for the file benchmark
//!
//! Sequential runs have no explicit offsets: the target's own cursor (or its
//! append cursor) advances by one operation each time. Random runs draw
//! `r` uniformly from `[0, extent - op_size]` and round it down to the
//! alignment, so every offset satisfies `offset + op_size <= extent` and
//! `offset % alignment == 0`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AccessPattern, WorkloadConfig};
use crate::error::{BenchError, Result};

/// Seed derived from the current wall-clock time
pub fn time_seed() -> u64 {
    let now = crate::timer::Timestamp::now();
    (now.secs as u64) ^ ((now.micros as u64) << 20)
}

/// Alignment-constrained uniform offsets inside `[0, extent - op_size]`
#[derive(Debug, Clone)]
pub struct RandomOffsets {
    rng: StdRng,
    max_start: u64,
    alignment: u64,
}

impl RandomOffsets {
    /// Build a generator for a target of `extent` bytes
    ///
    /// Fails with `InsufficientExtent` when no aligned offset fits.
    pub fn new(extent: u64, operation_size: u64, alignment: u64, seed: u64) -> Result<Self> {
        if alignment == 0 {
            return Err(BenchError::invalid("alignment must be >= 1, got 0"));
        }
        let max_start = extent
            .checked_sub(operation_size)
            .ok_or(BenchError::InsufficientExtent {
                what: "op size",
                required: operation_size,
                extent,
            })?;
        if extent < alignment {
            return Err(BenchError::InsufficientExtent {
                what: "alignment",
                required: alignment,
                extent,
            });
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            max_start,
            alignment,
        })
    }

    /// Largest offset a draw can produce before rounding
    pub fn max_start(&self) -> u64 {
        self.max_start
    }

    /// Next aligned offset
    pub fn next_offset(&mut self) -> u64 {
        let raw = self.rng.gen_range(0..=self.max_start);
        align_down(raw, self.alignment)
    }
}

/// Round `value` down to a multiple of `alignment` (`alignment >= 1`)
pub fn align_down(value: u64, alignment: u64) -> u64 {
    value - value % alignment
}

/// Where the next operation of a run executes
#[derive(Debug, Clone)]
pub enum OffsetGenerator {
    /// The target cursor advances by itself
    Sequential,
    Random(RandomOffsets),
}

impl OffsetGenerator {
    /// Generator matching the config's access pattern for a target of `extent` bytes
    pub fn for_workload(config: &WorkloadConfig, extent: u64) -> Result<Self> {
        match config.access_pattern() {
            AccessPattern::Sequential => Ok(OffsetGenerator::Sequential),
            AccessPattern::Random => {
                let seed = config.seed().unwrap_or_else(time_seed);
                tracing::debug!("random offsets seeded with {}", seed);
                Ok(OffsetGenerator::Random(RandomOffsets::new(
                    extent,
                    config.operation_size(),
                    config.alignment(),
                    seed,
                )?))
            }
        }
    }

    /// Explicit offset for the next operation, `None` when the cursor is implicit
    #[inline]
    pub fn next_offset(&mut self) -> Option<u64> {
        match self {
            OffsetGenerator::Sequential => None,
            OffsetGenerator::Random(random) => Some(random.next_offset()),
        }
    }
}
