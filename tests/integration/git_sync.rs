//! `GitSync::update_repo` against a local bare upstream.

use vcsync::constants::INITIAL_REVISION;
use vcsync::sync::git::GitSync;
use vcsync::sync::{SyncStep, UpdateOutcome};
use vcsync::test_utils::{README, RemoteFixture, TestGit, init_test_logging};

fn clone_fixture(remote: &RemoteFixture, name: &str) -> (GitSync, TestGit) {
    let path = remote.checkout_path(name);
    let repo = GitSync::builder(remote.url(), &path).build().unwrap();
    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Cloned);
    let git = TestGit::new(&path);
    git.config_user().unwrap();
    (repo, git)
}

#[test]
fn test_update_repo_clones_missing_working_copy() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    assert_eq!(git.current_branch().unwrap(), "master");
    assert_eq!(git.read_file(README).unwrap(), "first line\n");
    assert_eq!(repo.get_revision().unwrap(), remote.seed().rev_parse_head().unwrap());
    assert_eq!(git.remote_get_url("origin", false).unwrap(), remote.url());
}

#[test]
fn test_update_repo_fast_forwards_branch() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    let new_sha = remote.push_commit("CHANGELOG.md", "0.1.0\n", "Add changelog").unwrap();
    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Updated);
    assert_eq!(git.rev_parse_head().unwrap(), new_sha);
    assert_eq!(git.current_branch().unwrap(), "master");
}

#[test]
fn test_update_repo_carries_uncommitted_changes_across_rebase() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    git.write_file(README, "first line\nlocal edit\n").unwrap();
    let new_sha = remote.push_commit("CHANGELOG.md", "0.1.0\n", "Add changelog").unwrap();

    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Updated);
    assert_eq!(git.rev_parse_head().unwrap(), new_sha);
    assert_eq!(git.read_file(README).unwrap(), "first line\nlocal edit\n");
    assert!(git.stash_list().unwrap().is_empty());
}

#[test]
fn test_update_repo_rebases_local_commits() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    git.commit_file("local.txt", "mine\n", "Local work").unwrap();
    let upstream_sha = remote.push_commit("CHANGELOG.md", "0.1.0\n", "Add changelog").unwrap();

    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Updated);
    assert_eq!(git.run(&["rev-parse", "HEAD~1"]).unwrap(), upstream_sha);
    assert_eq!(git.read_file("local.txt").unwrap(), "mine\n");
}

#[test]
fn test_conflicting_stash_is_restored_on_original_head() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");
    let head_before = git.rev_parse_head().unwrap();

    git.write_file(README, "local version\n").unwrap();
    remote.push_commit(README, "upstream version\n", "Rewrite readme").unwrap();

    let outcome = repo.update_repo(false).unwrap();
    let UpdateOutcome::Recovered { step, .. } = outcome else {
        panic!("expected a recovered outcome, got {outcome:?}");
    };
    assert_eq!(step, SyncStep::StashPop);

    assert_eq!(git.rev_parse_head().unwrap(), head_before);
    assert_eq!(git.read_file(README).unwrap(), "local version\n");
    assert!(git.stash_list().unwrap().is_empty());
}

#[test]
fn test_conflicting_local_commit_reports_rebase_failure() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    git.commit_file(README, "local version\n", "Local rewrite").unwrap();
    remote.push_commit(README, "upstream version\n", "Upstream rewrite").unwrap();

    let outcome = repo.update_repo(false).unwrap();
    assert!(
        matches!(outcome, UpdateOutcome::Recovered { step: SyncStep::Rebase, .. }),
        "unexpected outcome {outcome:?}"
    );
    assert!(git.run(&["log", "--all", "--format=%s"]).unwrap().contains("Local rewrite"));
}

#[test]
fn test_refused_rebase_restores_stashed_changes() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    // The untracked file blocks the fast-forward, so git refuses before rebasing
    git.write_file(README, "first line\nlocal edit\n").unwrap();
    git.write_file("new.txt", "mine\n").unwrap();
    remote.push_commit("new.txt", "theirs\n", "Add new.txt").unwrap();

    let outcome = repo.update_repo(false).unwrap();
    assert!(
        matches!(outcome, UpdateOutcome::Recovered { step: SyncStep::Rebase, .. }),
        "unexpected outcome {outcome:?}"
    );
    assert_eq!(git.read_file(README).unwrap(), "first line\nlocal edit\n");
    assert_eq!(git.read_file("new.txt").unwrap(), "mine\n");
    assert!(git.stash_list().unwrap().is_empty());
}

#[test]
fn test_pinned_tag_is_idempotent() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let tagged = remote.push_tag("v1.0").unwrap();
    remote.push_commit("CHANGELOG.md", "1.1\n", "After the tag").unwrap();

    let path = remote.checkout_path("pinned");
    let repo = GitSync::builder(remote.url(), &path).rev("v1.0").build().unwrap();

    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Cloned);
    assert_eq!(repo.get_revision().unwrap(), tagged);
    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::AlreadyUpToDate);
    assert_eq!(repo.get_revision().unwrap(), tagged);
}

#[test]
fn test_pinned_sha_is_idempotent() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let first = remote.seed().rev_parse_head().unwrap();
    remote.push_commit("CHANGELOG.md", "0.2\n", "Second").unwrap();

    let path = remote.checkout_path("pinned-sha");
    let repo = GitSync::builder(format!("git+{}", remote.url()), &path).rev(first.clone()).build().unwrap();

    repo.update_repo(false).unwrap();
    assert_eq!(repo.get_revision().unwrap(), first);
    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::AlreadyUpToDate);
}

#[test]
fn test_explicit_remote_branch_rev() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("tracking");
    let repo = GitSync::builder(remote.url(), &path).rev("origin/master").build().unwrap();

    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Cloned);
    let new_sha = remote.push_commit("CHANGELOG.md", "0.3\n", "Third").unwrap();
    assert_eq!(repo.update_repo(false).unwrap(), UpdateOutcome::Updated);
    assert_eq!(repo.get_revision().unwrap(), new_sha);
}

#[test]
fn test_fetch_failure_is_recovered() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");
    let head = git.rev_parse_head().unwrap();

    std::fs::remove_dir_all(remote.bare_path()).unwrap();

    let outcome = repo.update_repo(false).unwrap();
    assert!(matches!(outcome, UpdateOutcome::Recovered { step: SyncStep::Fetch, .. }));
    assert_eq!(git.rev_parse_head().unwrap(), head);
}

#[test]
fn test_failed_clone_propagates() {
    init_test_logging(None);
    let temp = tempfile::TempDir::new().unwrap();
    let missing = temp.path().join("does-not-exist.git");
    let repo = GitSync::builder(missing.display().to_string(), temp.path().join("work")).build().unwrap();
    assert!(repo.update_repo(false).is_err());
}

#[test]
fn test_get_revision_of_empty_repository() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("empty");
    TestGit::new(&path).init().unwrap();
    let repo = GitSync::builder("https://example.com/empty.git", &path).build().unwrap();
    assert_eq!(repo.get_revision().unwrap(), INITIAL_REVISION);
}

#[test]
fn test_status_and_version() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let (repo, git) = clone_fixture(&remote, "work");

    git.commit_file("local.txt", "mine\n", "Local work").unwrap();
    let status = repo.status().unwrap();
    assert_eq!(status.branch_head.as_deref(), Some("master"));
    assert_eq!(status.branch_upstream.as_deref(), Some("origin/master"));
    assert_eq!(status.branch_ahead, Some(1));
    assert_eq!(status.branch_behind, Some(0));
    assert_eq!(repo.get_current_remote_name().unwrap(), "origin");

    assert!(repo.get_git_version().unwrap().major >= 2);
}
