// src/exec/orchestrator.rs

//! Pipeline orchestration: allocate channels, spawn one process per stage
//! with its redirections attached at spawn time, release the supervisor's
//! channel endpoints, then collect every stage's status in stage order.

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::anyhow;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{PipexecError, Result, StageFailure};
use crate::exec::channel::ChannelSet;
use crate::exec::redirect::{open_input, open_output};
use crate::exec::report::{ExitReport, StageReport, StageStatus};
use crate::pipeline::{Pipeline, Stage};

/// Knobs for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deadline for the whole run, measured from when collection starts.
    /// Stages still running afterwards are killed. `None` waits forever.
    pub timeout: Option<Duration>,
}

/// Pipeline-level progress, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Building,
    AllSpawned,
    AllCollected,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelinePhase::Building => "building",
            PipelinePhase::AllSpawned => "all-spawned",
            PipelinePhase::AllCollected => "all-collected",
        };
        f.write_str(s)
    }
}

/// A stage after the spawn attempt.
enum StageState {
    Spawned { child: Child, pid: Option<u32> },
    SpawnFailed(StageFailure),
}

/// Runs pipelines. Holds nothing but options, so one instance can run any
/// number of pipelines.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Execute `pipeline` and wait for every stage.
    ///
    /// Only channel allocation failure aborts the run (before anything is
    /// spawned). Every other failure is contained in the failing stage's
    /// report entry; `Ok` means every stage's outcome was collected, not
    /// that every stage succeeded.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<ExitReport> {
        info!(pipeline = %pipeline, "executing pipeline");
        info!(
            input = %display_path(pipeline.input()),
            output = %display_path(pipeline.output()),
            "resolved redirections"
        );

        let mut phase = PipelinePhase::Building;
        let mut channels = ChannelSet::allocate(pipeline.len())?;
        debug!(
            %phase,
            channels = channels.len(),
            single_stage = channels.is_empty(),
            "spawning stages"
        );

        let states: Vec<StageState> = pipeline
            .stages()
            .iter()
            .map(|stage| launch_stage(pipeline, stage, &channels))
            .collect();

        // Every stage is launched; readers only see EOF once we let go.
        channels.close_all();
        drop(channels);
        phase = PipelinePhase::AllSpawned;
        debug!(%phase, "supervisor holds no channel endpoints");

        let report = self.collect(pipeline, states).await;
        phase = PipelinePhase::AllCollected;
        debug!(%phase, stages = report.len(), "collected all stages");

        let report = report.finalize().map_err(|partial| {
            PipexecError::Other(anyhow!(
                "exit report incomplete: {} of {} stages",
                partial.len(),
                pipeline.len()
            ))
        })?;

        info!(
            pipeline = %pipeline,
            all_succeeded = report.all_succeeded(),
            "completed pipeline"
        );
        Ok(report)
    }

    async fn collect(&self, pipeline: &Pipeline, states: Vec<StageState>) -> ExitReport {
        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let mut report = ExitReport::new(pipeline.len());

        for (stage, state) in pipeline.stages().iter().zip(states) {
            let entry = match state {
                StageState::SpawnFailed(failure) => StageReport {
                    index: stage.index(),
                    program: stage.program().to_string(),
                    pid: None,
                    status: StageStatus::Failed(failure),
                    timed_out: false,
                },
                StageState::Spawned { mut child, pid } => {
                    let (result, timed_out) = wait_stage(stage, &mut child, deadline).await;
                    let status = match result {
                        Ok(exit) => StageStatus::from_exit_status(exit),
                        Err(source) => StageStatus::Failed(StageFailure::Wait {
                            pid,
                            source,
                        }),
                    };
                    StageReport {
                        index: stage.index(),
                        program: stage.program().to_string(),
                        pid,
                        status,
                        timed_out,
                    }
                }
            };

            info!(
                stage = entry.index,
                pid = ?entry.pid,
                ret = entry.status.exit_code(),
                status = %entry.status,
                "stage finished"
            );
            report.record(entry);
        }

        report
    }
}

/// Spawn one stage, turning any local failure into `SpawnFailed`.
fn launch_stage(pipeline: &Pipeline, stage: &Stage, channels: &ChannelSet) -> StageState {
    match spawn_stage(pipeline, stage, channels) {
        Ok(child) => {
            let pid = child.id();
            info!(
                stage = stage.index(),
                program = %stage.program(),
                pid = ?pid,
                "spawned stage"
            );
            StageState::Spawned { child, pid }
        }
        Err(failure) => {
            warn!(
                stage = stage.index(),
                program = %stage.program(),
                error = %failure,
                "stage failed to start"
            );
            StageState::SpawnFailed(failure)
        }
    }
}

fn spawn_stage(
    pipeline: &Pipeline,
    stage: &Stage,
    channels: &ChannelSet,
) -> std::result::Result<Child, StageFailure> {
    let index = stage.index();

    let stdin = if pipeline.is_first(index) {
        match pipeline.input() {
            Some(path) => open_input(path)?,
            None => Stdio::inherit(),
        }
    } else {
        channel_stdio(stage, channels.stdin_for(index))?
    };

    let stdout = if pipeline.is_last(index) {
        match pipeline.output() {
            Some(path) => open_output(path)?,
            None => Stdio::inherit(),
        }
    } else {
        channel_stdio(stage, channels.stdout_for(index))?
    };

    // The command owns our duplicates of this stage's endpoints and closes
    // them when it goes out of scope right after spawn.
    let mut cmd = Command::new(stage.program());
    cmd.args(stage.args()).stdin(stdin).stdout(stdout);

    cmd.spawn().map_err(|source| classify_spawn_error(stage, source))
}

/// Unwrap the channel endpoint an interior side of a stage is wired to.
fn channel_stdio(
    stage: &Stage,
    end: Option<Result<Stdio>>,
) -> std::result::Result<Stdio, StageFailure> {
    match end {
        Some(end) => end.map_err(|e| setup_failure(stage, e)),
        None => Err(StageFailure::Spawn {
            program: stage.program().to_string(),
            source: io::Error::other(format!("no channel for stage {}", stage.index())),
        }),
    }
}

fn setup_failure(stage: &Stage, err: PipexecError) -> StageFailure {
    let source = match err {
        PipexecError::IoError(e) => e,
        other => io::Error::other(other.to_string()),
    };
    StageFailure::Spawn {
        program: stage.program().to_string(),
        source,
    }
}

fn classify_spawn_error(stage: &Stage, source: io::Error) -> StageFailure {
    let program = stage.program().to_string();
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            StageFailure::Exec { program, source }
        }
        _ => StageFailure::Spawn { program, source },
    }
}

/// Wait for one stage, killing it if the deadline passes first.
///
/// Returns the wait result and whether the stage was killed.
async fn wait_stage(
    stage: &Stage,
    child: &mut Child,
    deadline: Option<Instant>,
) -> (io::Result<ExitStatus>, bool) {
    let Some(deadline) = deadline else {
        return (child.wait().await, false);
    };

    match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(result) => (result, false),
        Err(_elapsed) => {
            warn!(
                stage = stage.index(),
                program = %stage.program(),
                "deadline exceeded; killing stage"
            );
            if let Err(e) = child.start_kill() {
                warn!(stage = stage.index(), error = %e, "failed to kill stage");
            }
            (child.wait().await, true)
        }
    }
}

pub(crate) fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inherited>".to_string())
}
