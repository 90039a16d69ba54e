// src/exec/redirect.rs

//! File redirections for the two ends of a pipeline.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::process::Stdio;

use tracing::debug;

use crate::errors::StageFailure;

/// Permission bits for a freshly created output file.
pub const OUTPUT_FILE_MODE: u32 = 0o644;

/// Open `path` read-only as the first stage's stdin.
pub fn open_input(path: &Path) -> Result<Stdio, StageFailure> {
    let file = File::open(path).map_err(|source| StageFailure::Redirect {
        path: path.to_path_buf(),
        mode: "reading",
        source,
    })?;
    debug!(path = %path.display(), "opened input file");
    Ok(Stdio::from(file))
}

/// Open `path` write-only as the last stage's stdout, creating it if absent
/// and truncating it if present.
pub fn open_output(path: &Path) -> Result<Stdio, StageFailure> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(OUTPUT_FILE_MODE);
    }

    let file = options.open(path).map_err(|source| StageFailure::Redirect {
        path: path.to_path_buf(),
        mode: "writing",
        source,
    })?;
    debug!(path = %path.display(), "opened output file");
    Ok(Stdio::from(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_a_redirect_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_input(&dir.path().join("nope.txt")).unwrap_err();
        match err {
            StageFailure::Redirect { path, mode, .. } => {
                assert!(path.ends_with("nope.txt"));
                assert_eq!(mode, "reading");
            }
            other => panic!("expected Redirect, got {other:?}"),
        }
    }

    #[test]
    fn output_is_created_then_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        drop(open_output(&path).unwrap());
        assert!(path.exists());

        std::fs::write(&path, "stale contents").unwrap();
        drop(open_output(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn output_is_created_owner_rw_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        drop(open_output(&path).unwrap());

        // The process umask can only clear bits, never add them.
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !OUTPUT_FILE_MODE, 0);
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn output_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_output(&dir.path().join("missing/out.txt")).unwrap_err();
        assert!(matches!(err, StageFailure::Redirect { mode: "writing", .. }));
    }
}
