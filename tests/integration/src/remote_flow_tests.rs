//! End-to-end remote install, update, and removal flows
//!
//! Uses local git repositories as remotes; the clone, fetch, and
//! fast-forward paths are the same ones a network URL exercises.

use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

use ext_core::{InstallOptions, InstallSource, Installer, OutcomeStatus, Store};
use ext_fs::ScopePaths;
use ext_git::RepositoryRegistry;
use ext_meta::{ExtensionKind, Scope};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
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

/// An origin repository at `<tmp>/remotes/acme/toolkit` with one plugin.
fn init_origin(tmp: &TempDir) -> (Repository, String) {
    let path = tmp.path().join("remotes/acme/toolkit");
    fs::create_dir_all(&path).unwrap();
    let repo = Repository::init(&path).unwrap();
    write(
        &path.join("plugin.json"),
        r#"{ "name": "toolkit", "version": "1.0.0" }"#,
    );
    write(
        &path.join("hooks/fmt.json"),
        r#"{ "name": "fmt", "eventTypes": ["PreToolUse"], "commands": ["cargo fmt --check"] }"#,
    );
    write(
        &path.join("commands/deploy.md"),
        "# /deploy\n\nDeploy the stack.\n",
    );
    commit_all(&repo, "Initial");
    let url = path.to_str().unwrap().to_string();
    (repo, url)
}

struct Env {
    tmp: TempDir,
    installer: Installer,
    project: ScopePaths,
}

fn setup() -> Env {
    let tmp = TempDir::new().unwrap();
    let project = ScopePaths::at(tmp.path().join("project/.agent"));
    let store = Store::new(
        ScopePaths::at(tmp.path().join("home/.agent")),
        Some(project.clone()),
    );
    Env {
        installer: Installer::new(store),
        project,
        tmp,
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn install_all() -> InstallOptions {
    InstallOptions {
        force: false,
        install_all: true,
    }
}

fn checkout_dir(project: &ScopePaths) -> PathBuf {
    project.repos_dir().join("acme/toolkit")
}

#[test]
fn test_remote_install_clones_and_tracks_repository() {
    let env = setup();
    let (_origin, url) = init_origin(&env.tmp);

    let outcomes = env
        .installer
        .install(&InstallSource::Remote(url.clone()), Scope::Project, &install_all())
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Installed));

    // Checkout exists and the registry tracks it at its HEAD.
    let checkout = checkout_dir(&env.project);
    assert!(checkout.join("plugin.json").is_file());
    let registry = RepositoryRegistry::load(&env.project.repo_registry_file()).unwrap();
    let record = registry.get("acme/toolkit").unwrap();
    assert_eq!(record.url, url);
    assert!(record.plugins.contains("toolkit"));

    // Installed records point back to the repository.
    let config = read_json(&env.project.config_file());
    assert_eq!(
        config["extensions"]["hook:toolkit:fmt"]["metadata"]["repository"],
        "acme/toolkit"
    );
}

#[test]
fn test_failed_clone_leaves_no_directory() {
    let env = setup();
    let url = env.tmp.path().join("remotes/acme/missing");
    let err = env
        .installer
        .install(
            &InstallSource::Remote(url.to_str().unwrap().to_string()),
            Scope::Project,
            &install_all(),
        )
        .unwrap_err();
    assert!(matches!(err, ext_core::Error::Git(_)));
    assert!(!checkout_dir(&env.project).exists());
}

#[test]
fn test_repository_without_manifest_is_rejected() {
    let env = setup();
    let path = env.tmp.path().join("remotes/acme/toolkit");
    fs::create_dir_all(&path).unwrap();
    let repo = Repository::init(&path).unwrap();
    write(&path.join("README.md"), "not a plugin\n");
    commit_all(&repo, "Initial");

    let err = env
        .installer
        .install(
            &InstallSource::Remote(path.to_str().unwrap().to_string()),
            Scope::Project,
            &install_all(),
        )
        .unwrap_err();
    assert!(matches!(err, ext_core::Error::SourceNotFound(_)));
    // The useless fresh clone is cleaned up again.
    assert!(!checkout_dir(&env.project).exists());
}

#[test]
fn test_update_fast_forwards_and_refreshes_files() {
    let env = setup();
    let (origin, url) = init_origin(&env.tmp);
    env.installer
        .install(&InstallSource::Remote(url), Scope::Project, &install_all())
        .unwrap();

    // Advance the origin: the hook now runs on PostToolUse.
    write(
        &env.tmp.path().join("remotes/acme/toolkit/hooks/fmt.json"),
        r#"{ "name": "fmt", "eventTypes": ["PostToolUse"], "commands": ["cargo fmt"] }"#,
    );
    commit_all(&origin, "Change hook event");

    let outcomes = env.installer.update(Scope::Project, None).unwrap();
    let repo_outcome = outcomes.iter().find(|o| o.id == "acme/toolkit").unwrap();
    assert_eq!(repo_outcome.status, OutcomeStatus::Updated);
    let hook_outcome = outcomes.iter().find(|o| o.id == "hook:toolkit:fmt").unwrap();
    assert_eq!(hook_outcome.status, OutcomeStatus::Updated);

    let installed = read_json(&env.project.root().join("hooks/toolkit/fmt.json"));
    assert_eq!(installed["eventTypes"][0], "PostToolUse");
    let settings = read_json(&env.project.settings_file());
    assert_eq!(settings["hooks"]["PostToolUse"][0]["name"], "fmt");
    // The entry under the event the hook no longer subscribes to is gone.
    assert!(
        !settings["hooks"]
            .as_object()
            .unwrap()
            .contains_key("PreToolUse")
    );

    // A second update has nothing to do.
    let outcomes = env.installer.update(Scope::Project, None).unwrap();
    assert!(matches!(
        &outcomes[0].status,
        OutcomeStatus::Skipped { reason } if reason == "already up to date"
    ));
}

#[test]
fn test_update_unknown_repository_errors() {
    let env = setup();
    let err = env
        .installer
        .update(Scope::Project, Some("acme/ghost"))
        .unwrap_err();
    assert!(matches!(
        err,
        ext_core::Error::RepositoryNotTracked { .. }
    ));
}

#[test]
fn test_removing_last_plugin_drops_repository() {
    let env = setup();
    let (_origin, url) = init_origin(&env.tmp);
    env.installer
        .install(&InstallSource::Remote(url), Scope::Project, &install_all())
        .unwrap();

    env.installer
        .remove(Scope::Project, ExtensionKind::Hook, "toolkit:fmt")
        .unwrap();
    // One extension from the plugin is still installed.
    let registry = RepositoryRegistry::load(&env.project.repo_registry_file()).unwrap();
    assert!(registry.get("acme/toolkit").is_some());
    assert!(checkout_dir(&env.project).exists());

    env.installer
        .remove(Scope::Project, ExtensionKind::Command, "toolkit:deploy")
        .unwrap();
    let registry = RepositoryRegistry::load(&env.project.repo_registry_file()).unwrap();
    assert!(registry.get("acme/toolkit").is_none());
    assert!(!checkout_dir(&env.project).exists());
}
