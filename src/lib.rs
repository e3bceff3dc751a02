//! sysperf - storage and memory micro-benchmark harnesses
//!
//! This library provides the benchmark engines behind the `sysperf` binary:
//! a parameterized file I/O benchmark (sequential/random, read/write,
//! alignment, durability), an append-throughput preset, memory touch and
//! pointer-chasing benchmarks, and a hash-map benchmark. All of them run
//! through the same [`harness::Workload`] seam and report through
//! [`report::BenchmarkReport`].

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod harness;
pub mod map_bench;
pub mod memory;
pub mod offset;
pub mod report;
pub mod size;
pub mod target;
pub mod timer;

pub use config::WorkloadConfig;
pub use error::{BenchError, Result};
