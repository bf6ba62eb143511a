//! Many async synchronizers sharing one runtime.

use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vcsync::run::ProgressCallback;
use vcsync::sync::git::GitSync;
use vcsync::sync::{ProjectOptions, UpdateOutcome, VcsKind, create_async_project};
use vcsync::test_utils::{RemoteFixture, TestGit, init_test_logging};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_clones() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let expected = remote.seed().rev_parse_head().unwrap();

    let progress_chunks = Arc::new(AtomicUsize::new(0));
    let repos: Vec<_> = (0..6)
        .map(|i| {
            let counter = Arc::clone(&progress_chunks);
            let progress: ProgressCallback = Arc::new(move |_chunk: &str, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
            GitSync::builder(remote.url(), remote.checkout_path(&format!("clone-{i}")))
                .progress(progress)
                .build_async()
                .unwrap()
        })
        .collect();

    let outcomes = join_all(repos.iter().map(|repo| repo.update_repo(false))).await;
    for outcome in outcomes {
        assert_eq!(outcome.unwrap(), UpdateOutcome::Cloned);
    }
    for repo in &repos {
        assert_eq!(repo.get_revision().await.unwrap(), expected);
    }
    // Every streamed command ends with at least the sentinel chunk
    assert!(progress_chunks.load(Ordering::Relaxed) >= repos.len());
}

#[tokio::test]
async fn test_async_project_update_after_upstream_change() {
    init_test_logging(None);
    let remote = RemoteFixture::new().unwrap();
    let path = remote.checkout_path("project");
    let project = create_async_project(ProjectOptions::new(remote.url(), &path), Some("git")).unwrap();
    assert_eq!(project.kind(), VcsKind::Git);

    assert_eq!(project.update_repo(false).await.unwrap(), UpdateOutcome::Cloned);
    TestGit::new(&path).config_user().unwrap();

    let new_sha = remote.push_commit("NEWS", "news\n", "News").unwrap();
    assert_eq!(project.update_repo(false).await.unwrap(), UpdateOutcome::Updated);
    assert_eq!(project.get_revision().await.unwrap(), new_sha);
}
