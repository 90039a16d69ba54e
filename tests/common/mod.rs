#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

use pipexec::pipeline::Pipeline;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Build a pipeline from `&str` command tables, e.g.
/// `pipeline(&[&["cat"], &["grep", "hello"]])`.
pub fn pipeline(commands: &[&[&str]]) -> Pipeline {
    Pipeline::new(
        commands
            .iter()
            .map(|cmd| (cmd[0], cmd[1..].iter().copied())),
    )
    .expect("test pipeline must be valid")
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test fixture");
    path
}
