// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`channel`] allocates the inter-stage pipes and owns their endpoints.
//! - [`redirect`] opens the input/output files at the pipeline's ends.
//! - [`orchestrator`] spawns one `tokio::process::Command` per stage and
//!   collects their statuses.
//! - [`report`] holds the per-stage outcomes handed back to the caller.

pub mod channel;
pub mod orchestrator;
pub mod redirect;
pub mod report;

pub use channel::{Channel, ChannelSet, Endpoint};
pub use orchestrator::{Orchestrator, PipelinePhase, RunOptions};
pub use report::{ExitReport, StageReport, StageStatus};
