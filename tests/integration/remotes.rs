//! Remote queries and reconciliation on real working copies.

use vcsync::core::VcsError;
use vcsync::sync::git::{GitRemote, GitSync};
use vcsync::sync::{SyncStep, UpdateOutcome};
use vcsync::test_utils::{RemoteFixture, TestGit, init_test_logging};

#[test]
fn test_obtain_configures_extra_remotes() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let mirror = remote.checkout_path("mirror.git");
    TestGit::new(&mirror).init_bare().unwrap();

    let path = remote.checkout_path("work");
    let repo = GitSync::builder(remote.url(), &path)
        .remote("upstream", mirror.display().to_string())
        .remote_urls("fork", "https://example.com/fork.git", "git@example.com:me/fork.git")
        .build()
        .unwrap();
    repo.obtain().unwrap();

    let remotes = repo.remotes().unwrap();
    assert_eq!(remotes.keys().collect::<Vec<_>>(), ["fork", "origin", "upstream"]);
    assert_eq!(remotes["upstream"], GitRemote::new("upstream", mirror.display().to_string()));
    assert_eq!(remotes["fork"].fetch_url, "https://example.com/fork.git");
    assert_eq!(remotes["fork"].push_url, "git@example.com:me/fork.git");
}

#[test]
fn test_set_remotes_is_idempotent() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    let repo = GitSync::builder(remote.url(), &path)
        .remote("upstream", "https://example.com/upstream.git")
        .build()
        .unwrap();
    repo.obtain().unwrap();

    let before = repo.remotes().unwrap();
    repo.set_remotes(true).unwrap();
    repo.set_remotes(true).unwrap();
    assert_eq!(repo.remotes().unwrap(), before);
    assert_eq!(repo.configured_remotes().len(), 2);
}

#[test]
fn test_update_repo_reconciles_changed_remote() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    GitSync::builder(remote.url(), &path)
        .remote("upstream", "https://example.com/old.git")
        .build()
        .unwrap()
        .obtain()
        .unwrap();

    let repo = GitSync::builder(remote.url(), &path)
        .remote("upstream", "https://example.com/new.git")
        .build()
        .unwrap();
    repo.update_repo(true).unwrap();

    let git = TestGit::new(&path);
    assert_eq!(git.remote_get_url("upstream", false).unwrap(), "https://example.com/new.git");
    assert_eq!(git.remote_get_url("upstream", true).unwrap(), "https://example.com/new.git");
}

#[test]
fn test_set_remote_without_overwrite_fails_for_existing_remote() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    let repo = GitSync::builder(remote.url(), &path).build().unwrap();
    repo.obtain().unwrap();

    let err = repo.set_remote("origin", "https://example.com/other.git", false, false).unwrap_err();
    assert!(matches!(err, VcsError::CommandFailed(_)));

    let origin = repo.set_remote("origin", "git+https://example.com/other.git", false, true).unwrap();
    assert_eq!(origin.fetch_url, "https://example.com/other.git");
    assert!(repo.remote("missing").unwrap().is_none());
}

#[test]
fn test_remote_failure_during_update_is_recovered() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("work");
    GitSync::builder(remote.url(), &path).build().unwrap().obtain().unwrap();

    // An invalid remote name makes `git remote add` fail
    let repo = GitSync::builder(remote.url(), &path)
        .remote("bad name", "https://example.com/bad.git")
        .build()
        .unwrap();
    let outcome = repo.update_repo(true).unwrap();
    assert!(matches!(outcome, UpdateOutcome::Recovered { step: SyncStep::Remotes, .. }));
}
