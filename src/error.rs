//! Error taxonomy shared by the sampling core and the config store.
//!
//! None of these are fatal: source failures degrade a snapshot, malformed
//! config lines fall back to defaults, and history underflow reads as a zero
//! rate.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The metric family a source failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Cpu,
    Memory,
    Disk,
    Processes,
    /// The whole reading, e.g. when the adapter timed out.
    All,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Cpu => "cpu",
            Subsystem::Memory => "memory",
            Subsystem::Disk => "disk",
            Subsystem::Processes => "processes",
            Subsystem::All => "all metrics",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Error {
    /// One or more OS counters could not be read.
    #[error("{subsystem} unavailable: {reason}")]
    SourceUnavailable { subsystem: Subsystem, reason: String },

    /// A persisted setting could not be parsed.
    #[error("malformed config line {line}: {reason}")]
    ConfigMalformed { line: usize, reason: String },

    /// A rate was requested before two samples existed.
    #[error("rate needs two samples, {available} available")]
    HistoryUnderflow { available: usize },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl Error {
    pub fn unavailable(subsystem: Subsystem, reason: impl Into<String>) -> Self {
        Error::SourceUnavailable {
            subsystem,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            reason: err.to_string(),
        }
    }
}
