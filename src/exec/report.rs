// src/exec/report.rs

//! Per-stage outcomes, collected in stage order.

use std::fmt;
use std::process::ExitStatus;

use crate::errors::StageFailure;

/// How a stage ended.
#[derive(Debug)]
pub enum StageStatus {
    /// The process exited with this code.
    Exited(i32),
    /// The process was terminated by this signal.
    Signaled(i32),
    /// The stage never ran, or its status could not be collected.
    Failed(StageFailure),
}

impl StageStatus {
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return StageStatus::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return StageStatus::Signaled(signal);
            }
        }

        StageStatus::Exited(-1)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }

    /// Numeric status: the exit code, `128 + signal` for signalled
    /// processes, `-1` for stages that failed locally.
    pub fn exit_code(&self) -> i32 {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(signal) => 128 + signal,
            StageStatus::Failed(_) => -1,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Exited(code) => write!(f, "exited with status {code}"),
            StageStatus::Signaled(signal) => write!(f, "killed by signal {signal}"),
            StageStatus::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Report entry for one stage.
#[derive(Debug)]
pub struct StageReport {
    pub index: usize,
    pub program: String,
    /// `None` when the stage was never spawned.
    pub pid: Option<u32>,
    pub status: StageStatus,
    /// Set when the stage was killed after the run's deadline.
    pub timed_out: bool,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pid {
            Some(pid) => write!(f, "PID [{pid}]")?,
            None => f.write_str("PID [-]")?,
        }
        write!(
            f,
            ": stage {} ({}) ret = {}; {}",
            self.index,
            self.program,
            self.status.exit_code(),
            self.status
        )?;
        if self.timed_out {
            f.write_str(" (deadline exceeded)")?;
        }
        Ok(())
    }
}

/// Outcome of a whole run: one entry per stage, in stage order.
#[derive(Debug)]
pub struct ExitReport {
    expected: usize,
    stages: Vec<StageReport>,
}

impl ExitReport {
    /// Start an empty report for a pipeline of `expected` stages.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            stages: Vec::with_capacity(expected),
        }
    }

    /// Append the next stage's entry. Entries must arrive in stage order.
    pub fn record(&mut self, entry: StageReport) {
        debug_assert_eq!(entry.index, self.stages.len(), "stage recorded out of order");
        self.stages.push(entry);
    }

    pub fn is_complete(&self) -> bool {
        self.stages.len() == self.expected
    }

    /// Consume the builder once every stage has reported.
    ///
    /// Returns the partial report back as the error if entries are missing.
    pub fn finalize(self) -> Result<Self, Self> {
        if self.is_complete() { Ok(self) } else { Err(self) }
    }

    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when every stage exited with status 0.
    ///
    /// The run itself succeeds regardless; this is for callers that want a
    /// stricter verdict.
    pub fn all_succeeded(&self) -> bool {
        self.stages.iter().all(|s| s.status.is_success())
    }

    pub fn failed_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| !s.status.is_success())
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}
