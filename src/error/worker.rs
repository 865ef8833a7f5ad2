use std::fmt;

use thiserror::Error;

/// I/O step of a probe exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Write,
    Read,
}

impl IoOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            IoOperation::Write => "write",
            IoOperation::Read => "read",
        }
    }
}

impl fmt::Display for IoOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single worker operation.
///
/// These never leave the worker as errors: each one is stored on the `fail`
/// sample it caused and on the worker's final report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkerError {
    /// Refused, unreachable, name resolution failure, or connect timeout.
    #[error("connect failed: {detail}")]
    ConnectFailure { detail: String },
    /// Write or read exceeded the exchange timeout.
    #[error("{operation} timed out")]
    IoTimeout { operation: IoOperation },
    /// Reset, broken pipe, EOF before a full line, or an undecodable response.
    #[error("{operation} failed: {detail}")]
    IoError {
        operation: IoOperation,
        detail: String,
    },
}

impl WorkerError {
    #[must_use]
    pub fn connect(err: &std::io::Error) -> Self {
        WorkerError::ConnectFailure {
            detail: err.to_string(),
        }
    }

    #[must_use]
    pub fn connect_timeout(after: std::time::Duration) -> Self {
        WorkerError::ConnectFailure {
            detail: format!("timed out after {}ms", after.as_millis()),
        }
    }

    #[must_use]
    pub fn io(operation: IoOperation, err: &std::io::Error) -> Self {
        WorkerError::IoError {
            operation,
            detail: err.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            WorkerError::ConnectFailure { .. } => "connect_failure",
            WorkerError::IoTimeout { .. } => "io_timeout",
            WorkerError::IoError { .. } => "io_error",
        }
    }
}
