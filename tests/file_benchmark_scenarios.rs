//! End-to-end scenarios for the file benchmark engine
//!
//! A counting wrapper around a real file stands in for the target so the
//! number and size of system calls can be checked.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};

use sysperf::config::{AccessPattern, DurabilityMode, OperationKind, WorkloadConfig};
use sysperf::engine::run_file_benchmark;
use sysperf::executor::{Executor, IoTarget};
use sysperf::harness::measure;
use sysperf::offset::{OffsetGenerator, RandomOffsets};
use sysperf::target::BenchmarkTarget;
use sysperf::BenchError;
use tempfile::TempDir;

struct CountingFile {
    file: File,
    seeks: Vec<u64>,
    reads: Vec<usize>,
    writes: Vec<usize>,
    syncs: usize,
}

impl CountingFile {
    fn new(file: File) -> Self {
        Self {
            file,
            seeks: Vec::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            syncs: 0,
        }
    }
}

impl IoTarget for CountingFile {
    fn seek_to(&mut self, offset: u64) -> io::Result<u64> {
        self.seeks.push(offset);
        self.file.seek(SeekFrom::Start(offset))
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(buf)?;
        self.reads.push(n);
        Ok(n)
    }

    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.writes.push(n);
        Ok(n)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.syncs += 1;
        self.file.sync_all()
    }
}

#[test]
fn test_sequential_write_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("seq.out");
    let config = WorkloadConfig::builder(&path)
        .operation_size(4096)
        .operation_count(1000)
        .operation_kind(OperationKind::Write)
        .access_pattern(AccessPattern::Sequential)
        .durability_mode(DurabilityMode::None)
        .build()
        .unwrap();

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    let mut executor =
        Executor::new(&config, CountingFile::new(file), OffsetGenerator::Sequential).unwrap();

    let result = measure(&mut executor).unwrap();
    let target = executor.into_target();

    assert_eq!(target.writes.len(), 1000);
    assert!(target.writes.iter().all(|&n| n == 4096));
    assert!(target.seeks.is_empty());
    assert_eq!(target.syncs, 0);
    assert_eq!(result.bytes_transferred, 4_096_000);
    assert_eq!(fs::metadata(&path).unwrap().len(), 4_096_000);
}

#[test]
fn test_random_aligned_read_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rand.in");
    fs::write(&path, vec![7u8; 4096]).unwrap();

    let config = WorkloadConfig::builder(&path)
        .operation_size(512)
        .operation_count(10)
        .access_pattern(AccessPattern::Random)
        .alignment(512)
        .build()
        .unwrap();

    let offsets = OffsetGenerator::Random(RandomOffsets::new(4096, 512, 512, 2024).unwrap());
    let file = File::open(&path).unwrap();
    let mut executor = Executor::new(&config, CountingFile::new(file), offsets).unwrap();

    measure(&mut executor).unwrap();
    let target = executor.into_target();

    let allowed = [0, 512, 1024, 1536, 2048, 2560, 3072, 3584];
    assert_eq!(target.seeks.len(), 10);
    assert!(target.seeks.iter().all(|off| allowed.contains(off)));
    assert!(target.reads.iter().all(|&n| n == 512));
}

#[test]
fn test_fsync_each_syncs_inside_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("durable.out");
    let config = WorkloadConfig::builder(&path)
        .operation_size(128)
        .operation_count(20)
        .operation_kind(OperationKind::Write)
        .durability_mode(DurabilityMode::PerOperation)
        .build()
        .unwrap();

    let file = File::create(&path).unwrap();
    let mut executor =
        Executor::new(&config, CountingFile::new(file), OffsetGenerator::Sequential).unwrap();
    measure(&mut executor).unwrap();

    assert_eq!(executor.into_target().syncs, 20);
}

#[test]
fn test_sequential_write_always_truncates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.out");
    fs::write(&path, vec![1u8; 1 << 20]).unwrap();

    let config = WorkloadConfig::builder(&path)
        .operation_size(1024)
        .operation_count(3)
        .operation_kind(OperationKind::Write)
        .build()
        .unwrap();

    let target = BenchmarkTarget::open(&config).unwrap();
    assert_eq!(target.extent(), 0);
    drop(target);

    run_file_benchmark(&config).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 3072);
}

#[test]
fn test_zero_operations_report_does_not_divide() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zero.out");
    let config = WorkloadConfig::builder(&path)
        .operation_count(0)
        .operation_kind(OperationKind::Write)
        .build()
        .unwrap();

    let result = run_file_benchmark(&config).unwrap();
    assert_eq!(result.bytes_transferred, 0);
    assert_eq!(result.operations, 0);
    if result.elapsed_us == 0 {
        assert_eq!(result.throughput_bps(), None);
        assert_eq!(result.iops(), None);
    } else {
        assert_eq!(result.throughput_bps(), Some(0));
    }
}

#[test]
fn test_setup_boundaries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edge");
    fs::write(&path, vec![0u8; 2048]).unwrap();

    let build = |size: u64, align: u64| {
        WorkloadConfig::builder(&path)
            .operation_size(size)
            .operation_count(1)
            .access_pattern(AccessPattern::Random)
            .alignment(align)
            .build()
            .unwrap()
    };

    assert!(BenchmarkTarget::open(&build(2048, 1)).is_ok());
    assert!(matches!(
        BenchmarkTarget::open(&build(2049, 1)),
        Err(BenchError::InsufficientExtent { .. })
    ));
    assert!(BenchmarkTarget::open(&build(512, 2048)).is_ok());
    assert!(matches!(
        BenchmarkTarget::open(&build(512, 2049)),
        Err(BenchError::InsufficientExtent { .. })
    ));
}

#[test]
fn test_sequential_read_of_prefilled_target() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("seq.in");
    let config = WorkloadConfig::builder(&path)
        .operation_size(4096)
        .operation_count(256)
        .build()
        .unwrap();

    let result = run_file_benchmark(&config).unwrap();
    assert_eq!(result.bytes_transferred, 1 << 20);
    assert_eq!(fs::metadata(&path).unwrap().len(), 1 << 20);
}

#[test]
fn test_repeated_runs_release_descriptors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loop.out");
    let config = WorkloadConfig::builder(&path)
        .operation_size(64)
        .operation_count(4)
        .operation_kind(OperationKind::Write)
        .build()
        .unwrap();
    let failing = WorkloadConfig::builder(&path)
        .operation_size(1 << 20)
        .access_pattern(AccessPattern::Random)
        .build()
        .unwrap();

    let open_fds = || fs::read_dir("/proc/self/fd").unwrap().count();
    let before = open_fds();
    for _ in 0..50 {
        run_file_benchmark(&config).unwrap();
        assert!(run_file_benchmark(&failing).is_err());
    }
    // other tests share the process; a leak would show up as 100 extra fds
    assert!(open_fds() < before + 25);
}
