//! Benchmark target setup and teardown
//!
//! Write + Sequential runs truncate the target and open it for appending, so
//! the extent always starts at 0. Every other mode opens (creating if needed)
//! for read/write, optionally grows the file with pattern data outside the
//! timed window, and then requires `extent >= op_size` and `extent >= align`.
//!
//! The file handle is owned by [`BenchmarkTarget`] and released by `Drop`, so
//! it is closed on success and on every error path after setup.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::debug;

use crate::config::{AccessPattern, OperationKind, WorkloadConfig, DIRECT_IO_BLOCK};
use crate::error::{BenchError, Result};
use crate::executor::IoTarget;

/// Byte the I/O buffers are filled with; only the size of a transfer matters
pub const FILL_PATTERN: u8 = 0xEF;

/// Largest single write used while growing a target
const PREFILL_CHUNK: usize = 1024 * 1024;

/// An open benchmark target and its extent at the start of the run
#[derive(Debug)]
pub struct BenchmarkTarget {
    file: File,
    path: PathBuf,
    extent: u64,
}

impl BenchmarkTarget {
    /// Open the target implied by `config` and validate it against the workload
    pub fn open(config: &WorkloadConfig) -> Result<Self> {
        let path = config.target().to_path_buf();
        let file = open_options(config)
            .open(&path)
            .map_err(|e| unavailable(&path, "open", e))?;

        let mut target = Self {
            file,
            path,
            extent: 0,
        };

        if config.is_append() {
            debug!("opened {} for append, extent 0", target.path.display());
            return Ok(target);
        }

        target.extent = target.measure_extent()?;

        let wanted = required_extent(config);
        if wanted > target.extent {
            if config.direct_io() && target.extent % DIRECT_IO_BLOCK != 0 {
                return Err(BenchError::invalid(format!(
                    "cannot grow {} with direct I/O: its size ({}) is not a multiple of {}",
                    target.path.display(),
                    target.extent,
                    DIRECT_IO_BLOCK
                )));
            }
            target.grow_to(wanted)?;
        }
        target.rewind()?;

        if target.extent < config.operation_size() {
            return Err(BenchError::InsufficientExtent {
                what: "op size",
                required: config.operation_size(),
                extent: target.extent,
            });
        }
        if target.extent < config.alignment() {
            return Err(BenchError::InsufficientExtent {
                what: "alignment",
                required: config.alignment(),
                extent: target.extent,
            });
        }

        debug!(
            "opened {} with extent {}",
            target.path.display(),
            target.extent
        );
        Ok(target)
    }

    pub fn extent(&self) -> u64 {
        self.extent
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the target, measured by seeking to its end (works for block devices)
    fn measure_extent(&mut self) -> Result<u64> {
        self.file
            .seek(SeekFrom::End(0))
            .map_err(|e| unavailable(&self.path, "size", e))
    }

    fn rewind(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .map(|_| ())
            .map_err(|e| unavailable(&self.path, "rewind", e))
    }

    /// Append pattern data until the target holds `size` bytes, then sync
    fn grow_to(&mut self, size: u64) -> Result<()> {
        debug!(
            "growing {} from {} to {} bytes",
            self.path.display(),
            self.extent,
            size
        );

        // Page-aligned so the same path works for O_DIRECT targets
        let mut chunk =
            MmapMut::map_anon(PREFILL_CHUNK).map_err(|e| BenchError::unavailable("prefill buffer", e))?;
        chunk.fill(FILL_PATTERN);

        self.file
            .seek(SeekFrom::Start(self.extent))
            .map_err(|e| unavailable(&self.path, "prefill", e))?;

        let mut remaining = size - self.extent;
        while remaining > 0 {
            let len = remaining.min(PREFILL_CHUNK as u64) as usize;
            self.file
                .write_all(&chunk[..len])
                .map_err(|e| unavailable(&self.path, "prefill", e))?;
            remaining -= len as u64;
        }
        self.file
            .sync_all()
            .map_err(|e| unavailable(&self.path, "prefill", e))?;

        self.extent = size;
        Ok(())
    }
}

impl Drop for BenchmarkTarget {
    fn drop(&mut self) {
        debug!("teardown: closing {}", self.path.display());
    }
}

impl IoTarget for BenchmarkTarget {
    fn seek_to(&mut self, offset: u64) -> io::Result<u64> {
        self.file.seek(SeekFrom::Start(offset))
    }

    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.file, buf)
    }

    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

/// Open flags implied by the workload
fn open_options(config: &WorkloadConfig) -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).mode(0o600);

    let mut flags = 0;
    if config.is_append() {
        // O_APPEND goes through custom_flags: std refuses truncate(true) + append(true)
        options.truncate(true);
        flags |= libc::O_APPEND;
    }
    if config.sync_open() {
        flags |= libc::O_SYNC;
    }
    if config.direct_io() {
        flags |= libc::O_DIRECT;
    }
    options.custom_flags(flags);
    options
}

/// Size the target must reach before the timed window starts
///
/// A sequential read run needs `op_size * op_num` bytes so it never reaches EOF.
fn required_extent(config: &WorkloadConfig) -> u64 {
    let sequential_read = if config.operation_kind() == OperationKind::Read
        && config.access_pattern() == AccessPattern::Sequential
    {
        config.bytes_to_transfer()
    } else {
        0
    };
    sequential_read.max(config.prefill().unwrap_or(0))
}

fn unavailable(path: &Path, action: &str, source: io::Error) -> BenchError {
    BenchError::unavailable(format!("{} ({})", path.display(), action), source)
}
