//! Mercurial and Subversion checkouts; skipped when the binaries are absent.

use std::process::Command;
use vcsync::sync::hg::HgSync;
use vcsync::sync::svn::{SvnAuth, SvnSync};
use vcsync::sync::UpdateOutcome;
use vcsync::test_utils::{has_binary, init_test_logging};

fn sh(program: &str, args: &[&str], cwd: &std::path::Path) {
    let status = Command::new(program).args(args).current_dir(cwd).status().unwrap();
    assert!(status.success(), "{program} {args:?} failed");
}

#[test]
fn test_hg_clone_update_and_revision() {
    if !has_binary("hg") {
        eprintln!("hg not installed, skipping");
        return;
    }
    init_test_logging(None);
    let temp = tempfile::TempDir::new().unwrap();
    let upstream = temp.path().join("upstream");
    std::fs::create_dir(&upstream).unwrap();
    sh("hg", &["init"], &upstream);
    std::fs::write(upstream.join("README"), "hello\n").unwrap();
    sh("hg", &["add", "README"], &upstream);
    sh("hg", &["commit", "-m", "Initial", "-u", "Test User <test@vcsync.example>"], &upstream);

    let repo = HgSync::new(&format!("hg+{}", upstream.display()), temp.path().join("work"), None);
    assert_eq!(repo.update_repo().unwrap(), UpdateOutcome::Cloned);
    assert_eq!(repo.get_revision().unwrap(), "0");

    std::fs::write(upstream.join("README"), "hello again\n").unwrap();
    sh("hg", &["commit", "-m", "Second", "-u", "Test User <test@vcsync.example>"], &upstream);
    assert_eq!(repo.update_repo().unwrap(), UpdateOutcome::Updated);
    assert_eq!(repo.get_revision().unwrap(), "1");
}

#[test]
fn test_svn_checkout_and_revision() {
    if !has_binary("svn") || !has_binary("svnadmin") {
        eprintln!("svn not installed, skipping");
        return;
    }
    init_test_logging(None);
    let temp = tempfile::TempDir::new().unwrap();
    let repo_dir = temp.path().join("svnrepo");
    sh("svnadmin", &["create", &repo_dir.display().to_string()], temp.path());
    let url = format!("file://{}", repo_dir.display());

    let seed = temp.path().join("seed");
    sh("svn", &["checkout", "--quiet", &url, &seed.display().to_string()], temp.path());
    std::fs::write(seed.join("README"), "hello\n").unwrap();
    sh("svn", &["add", "--quiet", "README"], &seed);
    sh("svn", &["commit", "--quiet", "-m", "Initial"], &seed);

    let repo = SvnSync::new(&url, temp.path().join("work"), None, SvnAuth::default(), None);
    assert_eq!(repo.update_repo().unwrap(), UpdateOutcome::Cloned);
    assert_eq!(repo.get_revision().unwrap(), 1);
    assert_eq!(repo.update_repo().unwrap(), UpdateOutcome::Updated);
}
