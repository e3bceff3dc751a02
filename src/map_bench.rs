//! Hash-map operation benchmark
//!
//! Maps are built before the timed window. `insert` and `delete` consume their
//! map, so those run on a fresh map every round; the lookup variants reuse one.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::hint::black_box;
use std::mem::size_of;

use clap::ValueEnum;
use fnv::FnvBuildHasher;
use serde::Serialize;

use crate::error::{BenchError, Result};
use crate::harness::{measure_rounds, Workload};
use crate::report::RunResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapOp {
    /// Fill an empty map with `map_size` keys
    Insert,
    /// Look up keys that are present
    Hit,
    /// Look up keys that are absent
    Miss,
    /// Remove every key of a full map
    Delete,
    /// Insert then remove an absent key
    Insdel,
}

impl MapOp {
    /// Whether a round leaves the map unusable for the next one
    fn consumes_map(&self) -> bool {
        matches!(self, MapOp::Insert | MapOp::Delete)
    }
}

impl fmt::Display for MapOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MapOp::Insert => "INSERT",
            MapOp::Hit => "HIT",
            MapOp::Miss => "MISS",
            MapOp::Delete => "DELETE",
            MapOp::Insdel => "INSDEL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// std SipHash with random keys
    Std,
    /// FNV-1a
    Fnv,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapConfig {
    pub map_size: u64,
    pub op_num: u64,
    pub rounds: usize,
    pub op: MapOp,
    pub hasher: HasherKind,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_size: 1024 * 1024,
            op_num: 1024 * 1024,
            rounds: 5,
            op: MapOp::Insert,
            hasher: HasherKind::Std,
        }
    }
}

impl MapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.map_size == 0 {
            return Err(BenchError::invalid("map size must be >= 1"));
        }
        if self.rounds == 0 {
            return Err(BenchError::invalid("rounds must be >= 1"));
        }
        Ok(())
    }
}

impl fmt::Display for MapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hashmap benchmark op: {} op_num: {} map_size: {} round: {} hasher: {:?}",
            self.op, self.op_num, self.map_size, self.rounds, self.hasher
        )
    }
}

pub struct MapWorkload<S> {
    map: HashMap<u64, u64, S>,
    op: MapOp,
    map_size: u64,
    op_num: u64,
}

impl<S: BuildHasher + Default> MapWorkload<S> {
    pub fn new(config: &MapConfig) -> Self {
        let mut map = HashMap::with_hasher(S::default());
        if config.op != MapOp::Insert {
            map.extend((0..config.map_size).map(|k| (k, k)));
        }
        Self {
            map,
            op: config.op,
            map_size: config.map_size,
            op_num: config.op_num,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<S: BuildHasher> Workload for MapWorkload<S> {
    fn name(&self) -> &'static str {
        "map"
    }

    fn operation_count(&self) -> u64 {
        match self.op {
            MapOp::Insert | MapOp::Delete => self.map_size,
            MapOp::Hit | MapOp::Miss | MapOp::Insdel => self.op_num,
        }
    }

    fn bytes_per_operation(&self) -> u64 {
        (2 * size_of::<u64>()) as u64
    }

    fn execute(&mut self) -> Result<()> {
        match self.op {
            MapOp::Insert => {
                for k in 0..self.map_size {
                    self.map.insert(k, k);
                }
            }
            MapOp::Delete => {
                for k in 0..self.map_size {
                    black_box(self.map.remove(&k));
                }
            }
            MapOp::Hit => {
                for i in 0..self.op_num {
                    black_box(self.map.get(&(i % self.map_size)));
                }
            }
            MapOp::Miss => {
                for i in 0..self.op_num {
                    black_box(self.map.get(&(self.map_size + i)));
                }
            }
            MapOp::Insdel => {
                for i in 0..self.op_num {
                    let k = self.map_size + i;
                    self.map.insert(k, k);
                    black_box(self.map.remove(&k));
                }
            }
        }
        Ok(())
    }
}

/// Run every round of a hash-map benchmark with the configured hasher
pub fn run_map_benchmark(config: &MapConfig) -> Result<Vec<RunResult>> {
    config.validate()?;
    tracing::info!("{}", config);
    match config.hasher {
        HasherKind::Std => run_with::<RandomState>(config),
        HasherKind::Fnv => run_with::<FnvBuildHasher>(config),
    }
}

fn run_with<S: BuildHasher + Default>(config: &MapConfig) -> Result<Vec<RunResult>> {
    measure_rounds(config.rounds, config.op.consumes_map(), || {
        Ok(MapWorkload::<S>::new(config))
    })
}
