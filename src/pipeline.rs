// src/pipeline.rs

//! Runtime description of a pipeline: an ordered list of stages plus the
//! optional file redirections at either end.
//!
//! A `Pipeline` is built once (from a config file, or directly in code) and
//! never mutated afterwards; the orchestrator only borrows it.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{PipexecError, Result};

/// One command in the pipeline, run as exactly one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    index: usize,
    program: String,
    args: Vec<String>,
}

impl Stage {
    /// Position of this stage, `0..len`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Executable name, passed as argv[0] and resolved through `PATH`.
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// An ordered, non-empty sequence of stages with optional redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl Pipeline {
    /// Build a pipeline from `(program, args)` pairs in execution order.
    ///
    /// Fails when the list is empty or a program name is blank.
    pub fn new<I, P, A, S>(commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, A)>,
        P: Into<String>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages: Vec<Stage> = commands
            .into_iter()
            .enumerate()
            .map(|(index, (program, args))| Stage {
                index,
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            })
            .collect();

        if stages.is_empty() {
            return Err(PipexecError::ConfigError(
                "a pipeline needs at least one stage".to_string(),
            ));
        }
        if let Some(stage) = stages.iter().find(|s| s.program.trim().is_empty()) {
            return Err(PipexecError::ConfigError(format!(
                "stage {} has an empty program name",
                stage.index
            )));
        }

        Ok(Self {
            stages,
            input: None,
            output: None,
        })
    }

    /// Redirect stage 0's stdin from `path`.
    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Redirect the last stage's stdout to `path` (created or truncated).
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Never true for a pipeline built through [`Pipeline::new`].
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn is_first(&self, index: usize) -> bool {
        index == 0
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.stages.len()
    }

    /// Shell-style rendering, e.g. `cat < in.txt | grep hello > out.txt`.
    pub fn command_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(&stage.program)?;
            for arg in &stage.args {
                write!(f, " {arg}")?;
            }
            if i == 0 {
                if let Some(input) = &self.input {
                    write!(f, " < {}", input.display())?;
                }
            }
        }
        if let Some(output) = &self.output {
            write!(f, " > {}", output.display())?;
        }
        Ok(())
    }
}
