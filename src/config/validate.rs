// src/config/validate.rs

use crate::config::model::{PipelineFile, parse_duration};
use crate::errors::{PipexecError, Result};

/// Run semantic validation against a loaded pipeline file.
///
/// This checks:
/// - there is at least one `[[stage]]`
/// - every stage names a program
/// - `input` / `output`, when present, are non-empty paths
/// - `timeout`, when present, is a valid duration string
///
/// It does **not** check that programs exist or that files are readable;
/// those are per-stage failures reported at run time.
pub fn validate_config(cfg: &PipelineFile) -> Result<()> {
    ensure_has_stages(cfg)?;
    validate_stages(cfg)?;
    validate_pipeline_section(cfg)?;
    Ok(())
}

fn ensure_has_stages(cfg: &PipelineFile) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(PipexecError::ConfigError(
            "pipeline file must contain at least one [[stage]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_stages(cfg: &PipelineFile) -> Result<()> {
    for (index, stage) in cfg.stage.iter().enumerate() {
        if stage.program.trim().is_empty() {
            return Err(PipexecError::ConfigError(format!(
                "stage {} has an empty `program`",
                index
            )));
        }
    }
    Ok(())
}

fn validate_pipeline_section(cfg: &PipelineFile) -> Result<()> {
    let section = &cfg.pipeline;

    for (key, value) in [("input", &section.input), ("output", &section.output)] {
        if matches!(value, Some(path) if path.trim().is_empty()) {
            return Err(PipexecError::ConfigError(format!(
                "[pipeline].{} must not be empty",
                key
            )));
        }
    }

    if let Some(ref timeout) = section.timeout {
        parse_duration(timeout).map_err(|e| match e {
            PipexecError::ConfigError(msg) => {
                PipexecError::ConfigError(format!("[pipeline].timeout: {msg}"))
            }
            other => other,
        })?;
    }

    Ok(())
}
