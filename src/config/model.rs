// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::errors::{PipexecError, Result};
use crate::pipeline::Pipeline;

/// Top-level pipeline file as read from TOML.
///
/// ```toml
/// [pipeline]
/// input = "infile.txt"
/// output = "outfile.txt"
///
/// [[stage]]
/// program = "cat"
///
/// [[stage]]
/// program = "grep"
/// args = ["hello"]
/// ```
///
/// The `[pipeline]` section is optional; `[[stage]]` entries run in file
/// order.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// All stages from `[[stage]]`, in execution order.
    #[serde(default)]
    pub stage: Vec<StageConfig>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSection {
    /// File fed to the first stage's stdin.
    #[serde(default)]
    pub input: Option<String>,

    /// File receiving the last stage's stdout (created or truncated).
    #[serde(default)]
    pub output: Option<String>,

    /// Duration string (e.g. `"30s"`). Stages still running once it elapses
    /// are killed.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// `[[stage]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    /// Executable name or path.
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl PipelineFile {
    /// Build the runtime [`Pipeline`] described by this file.
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(
            self.stage
                .iter()
                .map(|s| (s.program.clone(), s.args.clone())),
        )?;
        if let Some(ref input) = self.pipeline.input {
            pipeline = pipeline.with_input(input);
        }
        if let Some(ref output) = self.pipeline.output {
            pipeline = pipeline.with_output(output);
        }
        Ok(pipeline)
    }

    /// Parsed `[pipeline].timeout`, if any.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.pipeline
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }
}

/// Suffixes accepted by [`parse_duration`] and their size in milliseconds.
/// `ms` has to be matched before `m` and `s`.
const DURATION_UNITS: [(&str, u64); 4] = [("ms", 1), ("s", 1_000), ("m", 60_000), ("h", 3_600_000)];

/// Parse a duration such as `"250ms"`, `"30s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = |why: &str| PipexecError::ConfigError(format!("invalid duration '{s}': {why}"));

    let (digits, unit_millis) = DURATION_UNITS
        .iter()
        .find_map(|&(suffix, millis)| s.strip_suffix(suffix).map(|d| (d.trim(), millis)))
        .ok_or_else(|| invalid("expected a ms, s, m or h suffix"))?;

    let value: u64 = digits
        .parse()
        .map_err(|_| invalid("expected a whole number before the unit"))?;

    value
        .checked_mul(unit_millis)
        .map(Duration::from_millis)
        .ok_or_else(|| invalid("too large"))
}
