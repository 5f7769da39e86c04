//! Repository manager integration tests against local git fixtures.

use std::fs;
use std::path::Path;

use git2::Repository;
use tempfile::TempDir;

use ext_git::{RepositoryManager, UpdateStatus};

/// Initialize a repository with one commit and return it.
fn init_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap();
    fs::write(path.join("plugin.json"), r#"{"name": "toolkit"}"#).unwrap();
    commit_all(&repo, "Initial");
    repo
}

fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
    let parents: Vec<git2::Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => vec![],
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

fn head_sha(path: &Path) -> String {
    let repo = Repository::open(path).unwrap();
    repo.head().unwrap().peel_to_commit().unwrap().id().to_string()
}

#[test]
fn test_clone_tracks_head() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();

    assert_eq!(record.commit, head_sha(&target));
    assert!(target.join("plugin.json").exists());
}

#[test]
fn test_failed_clone_leaves_no_directory() {
    let dst = TempDir::new().unwrap();
    let target = dst.path().join("toolkit");

    let manager = RepositoryManager::new();
    let err = manager.clone("/nonexistent/acme/toolkit", &target).unwrap_err();

    assert!(!target.exists(), "partial clone left behind: {err}");
}

#[test]
fn test_update_fast_forwards() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let src_repo = init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let mut record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();
    let sha0 = record.commit.clone();

    // Advance upstream
    fs::write(src.path().join("README.md"), "updated").unwrap();
    commit_all(&src_repo, "Second");

    let status = manager.update(&mut record).unwrap();
    match status {
        UpdateStatus::Updated { from, to } => {
            assert_eq!(from, sha0);
            assert_eq!(to, record.commit);
            assert_eq!(to, head_sha(&target));
        }
        other => panic!("expected Updated, got {other:?}"),
    }
    assert!(target.join("README.md").exists());
}

#[test]
fn test_update_when_current_is_up_to_date() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let mut record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();

    assert_eq!(manager.update(&mut record).unwrap(), UpdateStatus::UpToDate);
    assert_eq!(record.commit, head_sha(&target));
}

#[test]
fn test_diverged_history_reports_conflict_and_leaves_tree_unchanged() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let src_repo = init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let mut record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();
    let sha0 = record.commit.clone();

    // Diverge: one commit upstream, a different one locally
    fs::write(src.path().join("upstream.txt"), "upstream").unwrap();
    commit_all(&src_repo, "Upstream change");

    let local_repo = Repository::open(&target).unwrap();
    fs::write(target.join("local.txt"), "local").unwrap();
    commit_all(&local_repo, "Local change");
    let local_sha = head_sha(&target);

    let status = manager.update(&mut record).unwrap();
    match status {
        UpdateStatus::Conflict { local, remote } => {
            assert_eq!(local, local_sha);
            assert_ne!(remote, local_sha);
        }
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Working tree untouched
    assert_eq!(head_sha(&target), local_sha);
    assert!(!target.join("upstream.txt").exists());
    assert_eq!(record.commit, sha0, "tracked SHA must not move on conflict");
}

#[test]
fn test_rollback_restores_tracked_sha_and_head() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let src_repo = init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let mut record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();
    let sha0 = record.commit.clone();

    fs::write(src.path().join("v2.txt"), "v2").unwrap();
    commit_all(&src_repo, "v2");
    manager.update(&mut record).unwrap();
    assert_ne!(record.commit, sha0);
    assert!(target.join("v2.txt").exists());

    manager.rollback(&mut record, &sha0).unwrap();
    assert_eq!(record.commit, sha0);
    assert_eq!(head_sha(&target), sha0);
    assert!(!target.join("v2.txt").exists());
}

#[test]
fn test_rollback_to_unknown_sha_fails() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    init_repo(src.path());

    let manager = RepositoryManager::new();
    let target = dst.path().join("toolkit");
    let mut record = manager
        .clone(src.path().to_str().unwrap(), &target)
        .unwrap();

    let err = manager
        .rollback(&mut record, "0000000000000000000000000000000000000000")
        .unwrap_err();
    assert!(matches!(err, ext_git::Error::CommitNotFound { .. }));
}

#[test]
fn test_validate_structure_requires_manifest() {
    let tmp = TempDir::new().unwrap();
    let manager = RepositoryManager::new();

    let result = manager.validate_structure(tmp.path()).unwrap();
    assert!(!result.is_valid());

    fs::create_dir_all(tmp.path().join("toolkit")).unwrap();
    fs::write(tmp.path().join("toolkit/plugin.json"), "{}").unwrap();
    let result = manager.validate_structure(tmp.path()).unwrap();
    assert!(result.is_valid());
}
