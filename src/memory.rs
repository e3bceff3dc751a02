//! Memory benchmarks over an anonymous private mapping
//!
//! Two operation primitives share the harness:
//! - `touch`: write one byte every `stride` bytes (one page per op by default)
//! - `chase`: dependent loads through a cycle of word-sized slots
//!
//! With `fresh_map` the mapping is re-created before every round, which puts
//! first-touch page faults inside each measurement.

use std::fmt;
use std::mem::size_of;

use clap::ValueEnum;
use memmap2::MmapMut;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::AccessPattern;
use crate::error::{BenchError, Result};
use crate::harness::{measure_rounds, Workload};
use crate::offset::time_seed;
use crate::report::RunResult;

const WORD: usize = size_of::<usize>();

/// Operation primitive of a memory benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOp {
    /// Write one byte per stride
    Touch,
    /// Pointer chasing through a cycle of slots
    Chase,
}

impl MemoryOp {
    fn as_str(&self) -> &'static str {
        match self {
            MemoryOp::Touch => "touch",
            MemoryOp::Chase => "chase",
        }
    }
}

/// Parameters of a memory benchmark
#[derive(Debug, Clone, Serialize)]
pub struct MemoryConfig {
    pub mem_size: u64,
    pub op: MemoryOp,
    pub op_num: u64,
    pub pattern: AccessPattern,
    pub stride: u64,
    pub rounds: usize,
    pub fresh_map: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mem_size: 1024 * 1024 * 1024,
            op: MemoryOp::Touch,
            op_num: 256 * 1024,
            pattern: AccessPattern::Sequential,
            stride: 4096,
            rounds: 5,
            fresh_map: false,
            seed: None,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mem_size == 0 || usize::try_from(self.mem_size).is_err() {
            return Err(BenchError::invalid(format!(
                "invalid memory size ({})",
                self.mem_size
            )));
        }
        if self.rounds == 0 {
            return Err(BenchError::invalid("rounds must be >= 1"));
        }
        match self.op {
            MemoryOp::Touch if self.stride == 0 || self.stride > self.mem_size => {
                Err(BenchError::invalid(format!(
                    "stride must be in [1, {}], got {}",
                    self.mem_size, self.stride
                )))
            }
            MemoryOp::Chase if self.mem_size < WORD as u64 => Err(BenchError::invalid(format!(
                "memory size ({}) holds no {}-byte slot",
                self.mem_size, WORD
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for MemoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.pattern {
            AccessPattern::Sequential => "seq",
            AccessPattern::Random => "rnd",
        };
        write!(
            f,
            "memperf o:{}/a:{}/m:{}/n:{}/r:{}",
            self.op.as_str(),
            access,
            self.mem_size,
            self.op_num,
            self.rounds
        )
    }
}

/// A mapping prepared for one memory benchmark
pub struct MemoryWorkload {
    map: MmapMut,
    op: MemoryOp,
    op_num: u64,
    stride: usize,
    /// Random touch order; empty for sequential touches
    order: Vec<usize>,
    /// Where the next touch or chase resumes
    cursor: usize,
}

impl MemoryWorkload {
    /// Map and initialise the region; none of this is timed
    pub fn new(config: &MemoryConfig) -> Result<Self> {
        config.validate()?;
        let len = config.mem_size as usize;
        let mut map = MmapMut::map_anon(len).map_err(|e| {
            BenchError::unavailable(format!("anonymous mapping of {} bytes", len), e)
        })?;

        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(time_seed));
        let stride = config.stride as usize;
        let mut order = Vec::new();

        match (config.op, config.pattern) {
            (MemoryOp::Chase, AccessPattern::Sequential) => link_sequential(slots_mut(&mut map)),
            (MemoryOp::Chase, AccessPattern::Random) => {
                link_random_cycle(slots_mut(&mut map), &mut rng)
            }
            (MemoryOp::Touch, AccessPattern::Sequential) => {}
            (MemoryOp::Touch, AccessPattern::Random) => {
                order = (0..len / stride).map(|i| i * stride).collect();
                order.shuffle(&mut rng);
            }
        }

        Ok(Self {
            map,
            op: config.op,
            op_num: config.op_num,
            stride,
            order,
            cursor: 0,
        })
    }

    fn touch(&mut self) {
        let len = self.map.len();
        let mut off = self.cursor;
        for _ in 0..self.op_num {
            // SAFETY: `off < len`; the write goes through a valid &mut u8
            unsafe { std::ptr::write_volatile(&mut self.map[off], 0) };
            off += self.stride;
            if off >= len {
                off -= len;
            }
        }
        self.cursor = off;
    }

    fn touch_random(&mut self) {
        let mut idx = self.cursor;
        for _ in 0..self.op_num {
            let off = self.order[idx];
            // SAFETY: every entry of `order` is below the mapping length
            unsafe { std::ptr::write_volatile(&mut self.map[off], 0) };
            idx += 1;
            if idx == self.order.len() {
                idx = 0;
            }
        }
        self.cursor = idx;
    }

    fn chase(&mut self) {
        let slots = slots(&self.map);
        let mut idx = self.cursor;
        for _ in 0..self.op_num {
            idx = slots[idx];
        }
        self.cursor = std::hint::black_box(idx);
    }
}

impl Workload for MemoryWorkload {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn operation_count(&self) -> u64 {
        self.op_num
    }

    fn bytes_per_operation(&self) -> u64 {
        match self.op {
            MemoryOp::Touch => 1,
            MemoryOp::Chase => WORD as u64,
        }
    }

    fn execute(&mut self) -> Result<()> {
        match self.op {
            MemoryOp::Touch if self.order.is_empty() => self.touch(),
            MemoryOp::Touch => self.touch_random(),
            MemoryOp::Chase => self.chase(),
        }
        Ok(())
    }
}

/// Run every round of a memory benchmark
pub fn run_memory_benchmark(config: &MemoryConfig) -> Result<Vec<RunResult>> {
    config.validate()?;
    tracing::info!("memory benchmark: {}", config);
    measure_rounds(config.rounds, config.fresh_map, || MemoryWorkload::new(config))
}

fn slots(map: &MmapMut) -> &[usize] {
    // SAFETY: any bit pattern is a valid usize; mappings are page-aligned
    let (prefix, slots, _) = unsafe { map.align_to::<usize>() };
    debug_assert!(prefix.is_empty());
    slots
}

fn slots_mut(map: &mut MmapMut) -> &mut [usize] {
    // SAFETY: as in `slots`
    let (prefix, slots, _) = unsafe { map.align_to_mut::<usize>() };
    debug_assert!(prefix.is_empty());
    slots
}

/// slot i -> i + 1, last -> 0
fn link_sequential(slots: &mut [usize]) {
    let n = slots.len();
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = if i + 1 == n { 0 } else { i + 1 };
    }
}

/// One random cycle through every slot (Sattolo's algorithm)
fn link_random_cycle<R: Rng>(slots: &mut [usize], rng: &mut R) {
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = i;
    }
    for i in (1..slots.len()).rev() {
        let j = rng.gen_range(0..i);
        slots.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::measure;

    fn small(op: MemoryOp, pattern: AccessPattern) -> MemoryConfig {
        MemoryConfig {
            mem_size: 64 * 1024,
            op,
            op_num: 1000,
            pattern,
            stride: 4096,
            rounds: 2,
            fresh_map: false,
            seed: Some(17),
        }
    }

    fn cycle_len(slots: &[usize]) -> usize {
        let mut idx = slots[0];
        let mut steps = 1;
        while idx != 0 {
            idx = slots[idx];
            steps += 1;
            assert!(steps <= slots.len(), "slot chain does not return to 0");
        }
        steps
    }

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.mem_size, 1 << 30);
        assert_eq!(config.op_num, 262144);
        assert_eq!(config.stride, 4096);
        assert_eq!(config.rounds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = small(MemoryOp::Touch, AccessPattern::Sequential);
        config.stride = 0;
        assert!(config.validate().is_err());

        let mut config = small(MemoryOp::Touch, AccessPattern::Sequential);
        config.stride = config.mem_size + 1;
        assert!(config.validate().is_err());

        let mut config = small(MemoryOp::Chase, AccessPattern::Sequential);
        config.mem_size = 4;
        assert!(config.validate().is_err());

        let mut config = small(MemoryOp::Chase, AccessPattern::Sequential);
        config.rounds = 0;
        assert!(config.validate().is_err());

        let mut config = small(MemoryOp::Chase, AccessPattern::Sequential);
        config.mem_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sequential_links_form_one_cycle() {
        let mut slots = vec![0usize; 100];
        link_sequential(&mut slots);
        assert_eq!(slots[0], 1);
        assert_eq!(slots[99], 0);
        assert_eq!(cycle_len(&slots), 100);
    }

    #[test]
    fn test_random_links_form_one_cycle() {
        let mut rng = StdRng::seed_from_u64(5);
        for n in [1usize, 2, 3, 64, 1000] {
            let mut slots = vec![0usize; n];
            link_random_cycle(&mut slots, &mut rng);
            assert_eq!(cycle_len(&slots), n);
        }
    }

    #[test]
    fn test_chase_follows_links() {
        let config = MemoryConfig {
            op_num: 10,
            ..small(MemoryOp::Chase, AccessPattern::Sequential)
        };
        let mut workload = MemoryWorkload::new(&config).unwrap();
        workload.execute().unwrap();
        assert_eq!(workload.cursor, 10);

        // 64 KiB / 8 = 8192 slots; the walk wraps back to 0
        let config = MemoryConfig {
            op_num: (64 * 1024 / WORD) as u64,
            ..small(MemoryOp::Chase, AccessPattern::Sequential)
        };
        let mut workload = MemoryWorkload::new(&config).unwrap();
        workload.execute().unwrap();
        assert_eq!(workload.cursor, 0);
    }

    #[test]
    fn test_touch_wraps_at_mapping_end() {
        // 16 pages, 20 touches: cursor ends 4 pages in
        let config = MemoryConfig {
            op_num: 20,
            ..small(MemoryOp::Touch, AccessPattern::Sequential)
        };
        let mut workload = MemoryWorkload::new(&config).unwrap();
        workload.execute().unwrap();
        assert_eq!(workload.cursor, 4 * 4096);
    }

    #[test]
    fn test_random_touch_order_covers_every_page() {
        let workload =
            MemoryWorkload::new(&small(MemoryOp::Touch, AccessPattern::Random)).unwrap();
        let mut order = workload.order.clone();
        order.sort_unstable();
        let expected: Vec<_> = (0..16).map(|i| i * 4096).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_bytes_per_operation() {
        let mut touch =
            MemoryWorkload::new(&small(MemoryOp::Touch, AccessPattern::Sequential)).unwrap();
        assert_eq!(measure(&mut touch).unwrap().bytes_transferred, 1000);

        let mut chase =
            MemoryWorkload::new(&small(MemoryOp::Chase, AccessPattern::Random)).unwrap();
        assert_eq!(
            measure(&mut chase).unwrap().bytes_transferred,
            1000 * WORD as u64
        );
    }

    #[test]
    fn test_run_all_rounds() {
        let config = MemoryConfig {
            fresh_map: true,
            rounds: 3,
            ..small(MemoryOp::Touch, AccessPattern::Random)
        };
        let results = run_memory_benchmark(&config).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.operations == 1000));
    }

    #[test]
    fn test_display() {
        let config = small(MemoryOp::Chase, AccessPattern::Random);
        assert_eq!(config.to_string(), "memperf o:chase/a:rnd/m:65536/n:1000/r:2");
    }
}
