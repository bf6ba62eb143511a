//! The `vcsync` binary.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::{ConfigBuilder, run_vcsync};
use vcsync::test_utils::{RemoteFixture, TestGit, init_test_logging};

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("vcsync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("revision"));
}

#[test]
fn test_sync_clones_then_updates() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let first = remote.checkout_path("first");
    let second = remote.checkout_path("second");
    let config = ConfigBuilder::new()
        .max_parallel(2)
        .git_repo("first", &remote.url(), &first)
        .git_repo("second", &remote.url(), &second)
        .write_to(&remote.temp_path().join("vcsync.toml"))
        .unwrap();

    let output = run_vcsync(&config, &["sync"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("first: cloned"));
    assert!(output.stdout.contains("second: cloned"));
    assert!(first.join(".git").is_dir());
    assert!(second.join(".git").is_dir());

    let output = run_vcsync(&config, &["sync", "fir*"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("first: already up to date"));
    assert!(!output.stdout.contains("second"));

    remote.push_commit("CHANGELOG.md", "0.1.0\n", "Add changelog").unwrap();
    let output = run_vcsync(&config, &["sync", "first"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("first: updated"));
}

#[test]
fn test_sync_unknown_repository_suggests_name() {
    let remote = RemoteFixture::new().unwrap();
    let config = ConfigBuilder::new()
        .git_repo("libvcs", &remote.url(), &remote.checkout_path("libvcs"))
        .write_to(&remote.temp_path().join("vcsync.toml"))
        .unwrap();

    let output = run_vcsync(&config, &["sync", "libvsc"]).unwrap();
    assert!(!output.success);
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("Did you mean: libvcs"));
}

#[test]
fn test_sync_exits_nonzero_on_recovered_failure() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    let config = ConfigBuilder::new()
        .git_repo("work", &remote.url(), &path)
        .write_to(&remote.temp_path().join("vcsync.toml"))
        .unwrap();
    assert!(run_vcsync(&config, &["sync"]).unwrap().success);

    std::fs::remove_dir_all(remote.bare_path()).unwrap();
    let output = run_vcsync(&config, &["sync"]).unwrap();
    assert_eq!(output.code, Some(1));
    assert!(output.stderr.contains("work: fetch failed"));
}

#[test]
fn test_revision_and_status_of_working_copy() {
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    std::process::Command::new("git")
        .args(["clone", "--quiet", &remote.url(), &path.display().to_string()])
        .status()
        .unwrap();
    let sha = TestGit::new(&path).rev_parse_head().unwrap();

    Command::cargo_bin("vcsync")
        .unwrap()
        .args(["revision", &path.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains(sha.as_str()));

    Command::cargo_bin("vcsync")
        .unwrap()
        .args(["status", &path.display().to_string(), "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"branch_head\": \"master\""))
        .stdout(predicate::str::contains("\"branch_upstream\": \"origin/master\""));
}

#[test]
fn test_revision_rejects_plain_directory() {
    let temp = tempfile::TempDir::new().unwrap();
    Command::cargo_bin("vcsync")
        .unwrap()
        .args(["revision", &temp.path().display().to_string()])
        .env("NO_COLOR", "1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a git, hg or svn working copy"));
}

#[test]
fn test_list_json() {
    let remote = RemoteFixture::new().unwrap();
    let config = ConfigBuilder::new()
        .git_repo_at("libvcs", &remote.url(), &remote.checkout_path("libvcs"), "v1.0")
        .write_to(&remote.temp_path().join("vcsync.toml"))
        .unwrap();

    let output = run_vcsync(&config, &["list", "--format", "json"]).unwrap();
    assert!(output.success, "stderr: {}", output.stderr);
    let entries: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(entries[0]["name"], "libvcs");
    assert_eq!(entries[0]["vcs"], "git");
    assert_eq!(entries[0]["rev"], "v1.0");
    assert_eq!(entries[0]["present"], false);
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp = tempfile::TempDir::new().unwrap();
    let output = run_vcsync(&temp.path().join("absent.toml"), &["list"]).unwrap();
    assert!(!output.success);
    assert!(output.stderr.contains("absent.toml"));
}

#[test]
fn test_config_from_environment_variable() {
    let remote = RemoteFixture::new().unwrap();
    let config = ConfigBuilder::new()
        .git_repo("from-env", &remote.url(), &remote.checkout_path("from-env"))
        .write_to(&remote.temp_path().join("env.toml"))
        .unwrap();

    Command::cargo_bin("vcsync")
        .unwrap()
        .arg("list")
        .env("VCSYNC_CONFIG", &config)
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"));
}
