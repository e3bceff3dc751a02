//! CLI argument parsing for sysperf

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    AccessPattern, DurabilityMode, OperationKind, WorkloadConfig, DEFAULT_TARGET,
};
use crate::engine::{AppendConfig, DEFAULT_APPEND_TARGET};
use crate::error::Result;
use crate::map_bench::{HasherKind, MapConfig, MapOp};
use crate::memory::{MemoryConfig, MemoryOp};
use crate::size::parse_size_arg;

pub use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(name = "sysperf")]
#[command(version)]
#[command(about = "Storage and memory micro-benchmarks", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: ReportFormat,

    /// Pin the process to this CPU before running
    #[arg(long = "cpu", value_name = "CPU", global = true)]
    pub cpu: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read/write benchmark against a file: throughput and IOPS
    File(FileArgs),
    /// Append throughput: fixed-size writes up to a byte total
    Append(AppendArgs),
    /// Memory touch and pointer-chasing benchmark
    Mem(MemArgs),
    /// Hash-map operation benchmark
    Map(MapArgs),
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// Bytes per operation (suffixes K/M/G accepted)
    #[arg(long = "op-size", value_name = "SIZE", default_value = "4096", value_parser = parse_size_arg)]
    pub op_size: u64,

    /// Number of operations
    #[arg(long = "op-num", value_name = "COUNT", default_value = "131072", value_parser = parse_size_arg)]
    pub op_num: u64,

    /// Write instead of read
    #[arg(long)]
    pub write: bool,

    /// Random offsets instead of sequential
    #[arg(long)]
    pub random: bool,

    /// fsync() after every operation
    #[arg(long = "fsync", visible_alias = "fsync-each")]
    pub fsync: bool,

    /// Open the target with O_SYNC
    #[arg(long)]
    pub sync: bool,

    /// Open the target with O_DIRECT
    #[arg(long)]
    pub direct: bool,

    /// Target file
    #[arg(long = "file", value_name = "PATH", default_value = DEFAULT_TARGET)]
    pub file: PathBuf,

    /// Alignment of random offsets in bytes
    #[arg(long = "align", value_name = "SIZE", default_value = "1", value_parser = parse_size_arg)]
    pub align: u64,

    /// Seed for random offsets (default: current time)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Grow the target to at least SIZE bytes before measuring (not with a sequential --write)
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub prefill: Option<u64>,
}

impl FileArgs {
    pub fn to_config(&self) -> Result<WorkloadConfig> {
        let kind = if self.write {
            OperationKind::Write
        } else {
            OperationKind::Read
        };
        let pattern = if self.random {
            AccessPattern::Random
        } else {
            AccessPattern::Sequential
        };
        let durability = if self.fsync {
            DurabilityMode::PerOperation
        } else {
            DurabilityMode::None
        };

        WorkloadConfig::builder(&self.file)
            .operation_size(self.op_size)
            .operation_count(self.op_num)
            .operation_kind(kind)
            .access_pattern(pattern)
            .durability_mode(durability)
            .alignment(self.align)
            .sync_open(self.sync)
            .direct_io(self.direct)
            .seed(self.seed)
            .prefill(self.prefill)
            .build()
    }
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Bytes per write (at most 1M)
    #[arg(long = "write-size", value_name = "SIZE", default_value = "4096", value_parser = parse_size_arg)]
    pub write_size: u64,

    /// Total bytes to write
    #[arg(long = "write-total", value_name = "SIZE", default_value = "1G", value_parser = parse_size_arg)]
    pub write_total: u64,

    /// fsync() after every write
    #[arg(long = "fsync-each")]
    pub fsync_each: bool,

    /// Target file
    #[arg(long = "file", value_name = "PATH", default_value = DEFAULT_APPEND_TARGET)]
    pub file: PathBuf,
}

impl AppendArgs {
    pub fn to_config(&self) -> AppendConfig {
        AppendConfig {
            write_size: self.write_size,
            write_total: self.write_total,
            fsync_each: self.fsync_each,
            target: self.file.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct MemArgs {
    /// Size of the mapping
    #[arg(long = "mem-size", value_name = "SIZE", default_value = "1G", value_parser = parse_size_arg)]
    pub mem_size: u64,

    /// Operation primitive
    #[arg(long = "op", value_enum, default_value = "touch")]
    pub op: MemoryOp,

    /// Operations per round
    #[arg(long = "op-num", value_name = "COUNT", default_value = "262144", value_parser = parse_size_arg)]
    pub op_num: u64,

    /// Random access order instead of sequential
    #[arg(long)]
    pub random: bool,

    /// Distance between touches in bytes
    #[arg(long, value_name = "SIZE", default_value = "4096", value_parser = parse_size_arg)]
    pub stride: u64,

    /// Number of timed rounds
    #[arg(long, value_name = "N", default_value = "5")]
    pub rounds: usize,

    /// Re-create the mapping before every round (measures page faults)
    #[arg(long = "fresh-map")]
    pub fresh_map: bool,

    /// Seed for random orders (default: current time)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl MemArgs {
    pub fn to_config(&self) -> MemoryConfig {
        MemoryConfig {
            mem_size: self.mem_size,
            op: self.op,
            op_num: self.op_num,
            pattern: if self.random {
                AccessPattern::Random
            } else {
                AccessPattern::Sequential
            },
            stride: self.stride,
            rounds: self.rounds,
            fresh_map: self.fresh_map,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Operation to measure
    #[arg(long = "op", value_enum, default_value = "insert")]
    pub op: MapOp,

    /// Keys in the map
    #[arg(long = "map-size", value_name = "COUNT", default_value = "1048576", value_parser = parse_size_arg)]
    pub map_size: u64,

    /// Operations per round for hit/miss/insdel
    #[arg(long = "op-num", value_name = "COUNT", default_value = "1048576", value_parser = parse_size_arg)]
    pub op_num: u64,

    /// Number of timed rounds
    #[arg(long, value_name = "N", default_value = "5")]
    pub rounds: usize,

    /// Hash function
    #[arg(long, value_enum, default_value = "std")]
    pub hasher: HasherKind,
}

impl MapArgs {
    pub fn to_config(&self) -> MapConfig {
        MapConfig {
            map_size: self.map_size,
            op_num: self.op_num,
            rounds: self.rounds,
            op: self.op,
            hasher: self.hasher,
        }
    }
}
