// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::PipelineFile;
use crate::config::validate::validate_config;
use crate::errors::Result;

/// Load a pipeline file from a given path and return the raw `PipelineFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: PipelineFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a pipeline file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde`).
/// - Checks for:
///   - at least one stage,
///   - non-empty program names and redirection paths,
///   - a parseable timeout.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Default pipeline file: `Pipeline.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}
