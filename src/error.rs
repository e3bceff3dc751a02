//! Error kinds shared by every benchmark
//!
//! All of them are fatal: a degraded run would report misleading numbers, so
//! nothing here is retried and nothing produces a partial report.

use std::io;
use thiserror::Error;

use crate::config::OperationKind;

/// Errors raised while configuring, setting up or running a benchmark
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{resource} unavailable: {source}")]
    ResourceUnavailable {
        resource: String,
        #[source]
        source: io::Error,
    },

    #[error("{what} ({required}) is greater than target size ({extent})")]
    InsufficientExtent {
        what: &'static str,
        required: u64,
        extent: u64,
    },

    #[error("lseek() to offset {offset} failed: {source}")]
    SeekFailure {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("{kind} transferred {actual} of {expected} bytes")]
    IncompleteTransfer {
        kind: OperationKind,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} failed: {source}")]
    TransferFailure {
        kind: OperationKind,
        #[source]
        source: io::Error,
    },

    #[error("fsync() failed: {0}")]
    FlushFailure(#[source] io::Error),
}

impl BenchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        BenchError::InvalidConfiguration(message.into())
    }

    pub(crate) fn unavailable(resource: impl Into<String>, source: io::Error) -> Self {
        BenchError::ResourceUnavailable {
            resource: resource.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_extent_message() {
        let err = BenchError::InsufficientExtent {
            what: "op size",
            required: 4096,
            extent: 100,
        };
        assert_eq!(
            err.to_string(),
            "op size (4096) is greater than target size (100)"
        );
    }

    #[test]
    fn test_incomplete_transfer_names_operation() {
        let err = BenchError::IncompleteTransfer {
            kind: OperationKind::Read,
            expected: 512,
            actual: 100,
        };
        assert_eq!(err.to_string(), "READ transferred 100 of 512 bytes");
    }

    #[test]
    fn test_resource_unavailable_keeps_source() {
        let err = BenchError::unavailable(
            "file /nonexistent/x",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.to_string().starts_with("file /nonexistent/x unavailable"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
