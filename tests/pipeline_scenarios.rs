// tests/pipeline_scenarios.rs
mod common;
use crate::common::{init_tracing, pipeline, write_file};

use std::error::Error;
use std::fs;
use std::time::Duration;

use tokio::time::timeout;

use pipexec::errors::StageFailure;
use pipexec::exec::{Orchestrator, RunOptions, StageStatus};

type TestResult = Result<(), Box<dyn Error>>;

/// Upper bound for any single test run; a hang here means a leaked endpoint.
const HANG_GUARD: Duration = Duration::from_secs(20);

#[tokio::test]
async fn three_stage_filter_keeps_only_lines_matching_both() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = write_file(dir.path(), "infile.txt", "hello\nworld\nthe\n");
    let output = dir.path().join("outfile.txt");

    let p = pipeline(&[&["cat"], &["grep", "hello"], &["grep", "he"]])
        .with_input(&input)
        .with_output(&output);

    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert_eq!(fs::read_to_string(&output)?, "hello\n");
    assert_eq!(report.len(), 3);
    assert!(report.is_complete());
    assert!(report.all_succeeded());
    for (i, stage) in report.stages().iter().enumerate() {
        assert_eq!(stage.index, i);
        assert!(stage.pid.is_some());
        assert!(!stage.timed_out);
    }
    Ok(())
}

#[tokio::test]
async fn single_stage_copies_input_to_output() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = write_file(dir.path(), "in.txt", "abc\n");
    let output = dir.path().join("out.txt");

    let p = pipeline(&[&["cat"]]).with_input(&input).with_output(&output);
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert_eq!(fs::read_to_string(&output)?, "abc\n");
    assert_eq!(report.len(), 1);
    assert!(matches!(report.stages()[0].status, StageStatus::Exited(0)));
    Ok(())
}

#[tokio::test]
async fn rerunning_truncates_previous_output() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.txt");

    let first = write_file(dir.path(), "first.txt", "a much longer first run\nwith two lines\n");
    let p = pipeline(&[&["cat"]]).with_input(&first).with_output(&output);
    timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    let second = write_file(dir.path(), "second.txt", "short\n");
    let p = pipeline(&[&["cat"]]).with_input(&second).with_output(&output);
    timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert_eq!(fs::read_to_string(&output)?, "short\n");
    Ok(())
}

#[tokio::test]
async fn missing_input_fails_first_stage_only() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.txt");

    let p = pipeline(&[&["cat"], &["wc", "-l"]])
        .with_input(dir.path().join("does-not-exist.txt"))
        .with_output(&output);
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert!(report.is_complete());
    let first = &report.stages()[0];
    assert!(first.pid.is_none());
    assert_ne!(first.status.exit_code(), 0);
    assert!(matches!(
        first.status.failure(),
        Some(StageFailure::Redirect { mode: "reading", .. })
    ));

    // The second stage sees immediate end-of-input and still runs to completion.
    let second = &report.stages()[1];
    assert!(matches!(second.status, StageStatus::Exited(0)));
    assert_eq!(fs::read_to_string(&output)?.trim(), "0");
    Ok(())
}

#[tokio::test]
async fn unwritable_output_fails_last_stage_only() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = write_file(dir.path(), "in.txt", "abc\n");

    let p = pipeline(&[&["cat"], &["cat"]])
        .with_input(&input)
        .with_output(dir.path().join("missing-dir/out.txt"));
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert!(report.is_complete());
    assert!(report.stages()[0].pid.is_some());
    assert!(matches!(
        report.stages()[1].status.failure(),
        Some(StageFailure::Redirect { mode: "writing", .. })
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_program_is_reported_without_aborting_siblings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = write_file(dir.path(), "in.txt", "hello\n");
    let output = dir.path().join("out.txt");

    let p = pipeline(&[
        &["cat"],
        &["pipexec-no-such-program-xyz"],
        &["cat"],
    ])
    .with_input(&input)
    .with_output(&output);
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert_eq!(report.len(), 3);
    assert!(!report.all_succeeded());

    let broken = &report.stages()[1];
    assert!(broken.pid.is_none());
    assert_eq!(broken.status.exit_code(), -1);
    assert!(matches!(
        broken.status.failure(),
        Some(StageFailure::Exec { program, .. }) if program == "pipexec-no-such-program-xyz"
    ));

    // Stage 2 reads EOF and exits cleanly; stage 0 may exit 0 or die on a
    // closed pipe, but it is always collected with a real pid.
    assert!(report.stages()[0].pid.is_some());
    assert!(report.stages()[0].status.failure().is_none());
    assert!(matches!(report.stages()[2].status, StageStatus::Exited(0)));
    assert_eq!(fs::read_to_string(&output)?, "");
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_codes_are_reported_per_stage() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.txt");

    let p = pipeline(&[&["sh", "-c", "echo hi; exit 3"], &["cat"]]).with_output(&output);
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert!(matches!(report.stages()[0].status, StageStatus::Exited(3)));
    assert!(matches!(report.stages()[1].status, StageStatus::Exited(0)));
    assert_eq!(fs::read_to_string(&output)?, "hi\n");
    let failed: Vec<usize> = report.failed_stages().map(|s| s.index).collect();
    assert_eq!(failed, vec![0]);
    Ok(())
}

#[tokio::test]
async fn intermediate_stages_never_touch_files() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let input = write_file(dir.path(), "in.txt", "one\ntwo\nthree\n");
    let output = dir.path().join("out.txt");

    // Each middle stage tags its own stdin; only channel data reaches it.
    let p = pipeline(&[
        &["cat"],
        &["sed", "s/^/a:/"],
        &["sed", "s/^/b:/"],
        &["cat"],
    ])
    .with_input(&input)
    .with_output(&output);
    let report = timeout(HANG_GUARD, Orchestrator::default().run(&p)).await??;

    assert!(report.all_succeeded());
    assert_eq!(
        fs::read_to_string(&output)?,
        "b:a:one\nb:a:two\nb:a:three\n"
    );
    Ok(())
}

#[tokio::test]
async fn deadline_kills_unresponsive_stages() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("out.txt");

    let p = pipeline(&[&["echo", "tick"], &["sleep", "30"], &["cat"]]).with_output(&output);
    let orchestrator = Orchestrator::new(RunOptions {
        timeout: Some(Duration::from_millis(500)),
    });
    let report = timeout(HANG_GUARD, orchestrator.run(&p)).await??;

    assert!(report.is_complete());
    assert!(!report.stages()[0].timed_out);
    assert!(matches!(report.stages()[0].status, StageStatus::Exited(0)));

    let sleeper = &report.stages()[1];
    assert!(sleeper.timed_out);
    assert!(matches!(sleeper.status, StageStatus::Signaled(_)));

    // Once the sleeper is gone `cat` sees EOF and finishes on its own.
    assert!(report.stages()[2].status.failure().is_none());
    Ok(())
}
