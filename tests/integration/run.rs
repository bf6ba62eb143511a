//! Runner behavior against the real git binary.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use vcsync::constants::{END_OF_STREAM, PROGRESS_CHUNK_SIZE};
use vcsync::core::VcsError;
use vcsync::run::{CommandRequest, ProgressCallback, async_run, run, wrap_sync_callback};
use vcsync::test_utils::{RemoteFixture, init_test_logging};

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<String>>>) {
    let chunks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&chunks);
    let callback: ProgressCallback = Arc::new(move |chunk: &str, _| {
        sink.lock().unwrap().push(chunk.to_string());
    });
    (callback, chunks)
}

#[test]
fn test_git_version_through_run() {
    init_test_logging(None);
    let output = run(&CommandRequest::new("git").arg("--version"), None).unwrap();
    assert!(output.starts_with("git version"));
}

#[test]
fn test_clone_progress_reaches_callback() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let dest = remote.checkout_path("clone");
    let (callback, chunks) = recording_callback();

    let request = CommandRequest::new("git")
        .args(["clone", "--progress", &remote.url(), &dest.display().to_string()])
        .log_in_real_time(true);
    run(&request, Some(&callback)).unwrap();

    let chunks = chunks.lock().unwrap();
    assert_eq!(chunks.last().map(String::as_str), Some(END_OF_STREAM));
    let body: Vec<_> = chunks.iter().take(chunks.len() - 1).collect();
    assert!(!body.is_empty(), "git clone --progress writes to stderr");
    for chunk in &body[..body.len().saturating_sub(1)] {
        assert_eq!(chunk.len(), PROGRESS_CHUNK_SIZE);
    }
    assert!(dest.join(".git").is_dir());
}

#[test]
fn test_failed_git_command_is_command_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let err = run(
        &CommandRequest::new("git").args(["rev-parse", "--verify", "HEAD"]).current_dir(temp.path()),
        None,
    )
    .unwrap_err();
    let VcsError::CommandFailed(payload) = err else {
        panic!("expected CommandFailed");
    };
    assert_ne!(payload.returncode, 0);
    assert_eq!(payload.cmd, "git rev-parse --verify HEAD");
    assert!(!payload.output.is_empty());
}

#[tokio::test]
async fn test_async_run_with_wrapped_callback() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let dest = remote.checkout_path("async-clone");
    let (callback, chunks) = recording_callback();
    let callback = wrap_sync_callback(callback);

    let request = CommandRequest::new("git")
        .args(["clone", "--progress", &remote.url(), &dest.display().to_string()])
        .timeout(Duration::from_secs(60));
    async_run(&request, Some(&callback)).await.unwrap();

    assert_eq!(chunks.lock().unwrap().last().map(String::as_str), Some(END_OF_STREAM));
    assert!(dest.join("README.md").is_file());
}
