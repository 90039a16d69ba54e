// src/errors.rs

//! Crate-wide error types.
//!
//! [`PipexecError`] covers failures that abort a whole run (bad config,
//! channel allocation). [`StageFailure`] covers failures that stay local to
//! one stage and end up in that stage's report entry instead of propagating.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipexecError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to allocate {requested} channels: {source}")]
    Allocation {
        requested: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("channel {channel} {side} end is already closed")]
    EndpointClosed { channel: usize, side: EndpointSide },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipexecError>;

/// Which side of a channel an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSide {
    Read,
    Write,
}

impl fmt::Display for EndpointSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSide::Read => f.write_str("read"),
            EndpointSide::Write => f.write_str("write"),
        }
    }
}

/// Why a single stage did not run to a normal termination.
#[derive(Error, Debug)]
pub enum StageFailure {
    /// The input or output file could not be opened.
    #[error("cannot open {} for {mode}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        mode: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The program could not be located or invoked.
    #[error("cannot execute '{program}': {source}")]
    Exec {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Process creation failed for a reason unrelated to the program itself.
    #[error("cannot spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The stage was launched but its status could not be collected.
    #[error("waiting for {} failed: {source}", .pid.map_or("stage process".to_string(), |p| format!("pid {p}")))]
    Wait {
        /// `None` when the process id was already unavailable.
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },
}
