//! End-to-end local install flows
//!
//! Exercises the full pipeline from a plugin directory on disk through
//! discovery, validation, transactions, and the resulting host
//! configuration files — without any git remote involved.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

use ext_core::{InstallOptions, InstallSource, Installer, OutcomeStatus, Store};
use ext_fs::ScopePaths;
use ext_meta::{ExtensionKind, Scope};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A plugin with one hook, one command, and one server.
fn write_toolkit_plugin(root: &Path) {
    write(
        &root.join("plugin.json"),
        r#"{ "name": "toolkit", "version": "1.2.0", "description": "Dev toolkit" }"#,
    );
    write(
        &root.join("hooks/fmt.json"),
        r#"{ "name": "fmt", "eventTypes": ["PreToolUse"], "commands": ["cargo fmt --check"] }"#,
    );
    write(
        &root.join("commands/deploy.md"),
        "# /deploy\n\nDeploy the ${environment} stack.\n",
    );
    write(
        &root.join("servers/api.json"),
        r#"{ "command": "api-server", "args": ["--port", "8080"] }"#,
    );
}

struct Env {
    _tmp: TempDir,
    installer: Installer,
    project: ScopePaths,
    source_dir: PathBuf,
}

fn setup() -> Env {
    let tmp = TempDir::new().unwrap();
    let project = ScopePaths::at(tmp.path().join("project/.agent"));
    let store = Store::new(ScopePaths::at(tmp.path().join("home/.agent")), Some(project.clone()));
    let source_dir = tmp.path().join("src");
    Env {
        installer: Installer::new(store),
        project,
        source_dir,
        _tmp: tmp,
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

#[test]
fn test_plugin_install_places_files_and_config() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);

    let outcomes = env
        .installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Installed));

    // Files land under the kind directory, namespaced by plugin.
    assert!(env.project.root().join("hooks/toolkit/fmt.json").is_file());
    assert!(env.project.root().join("commands/toolkit/deploy.md").is_file());
    assert!(env.project.root().join("servers/toolkit/api.json").is_file());

    let config = read_json(&env.project.config_file());
    let extensions = config["extensions"].as_object().unwrap();
    assert!(extensions.contains_key("hook:toolkit:fmt"));
    assert!(extensions.contains_key("command:toolkit:deploy"));
    assert!(extensions.contains_key("server:toolkit:api"));
    assert_eq!(extensions["command:toolkit:deploy"]["version"], "1.2.0");
    assert_eq!(config["servers"]["toolkit:api"]["command"], "api-server");

    // Hook entry registered under its subscribed event.
    let settings = read_json(&env.project.settings_file());
    assert_eq!(settings["hooks"]["PreToolUse"][0]["name"], "fmt");
    assert_eq!(
        settings["hooks"]["PreToolUse"][0]["commands"][0],
        "cargo fmt --check"
    );
}

#[test]
fn test_reinstall_skips_then_force_replaces() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);
    let source = InstallSource::Path(env.source_dir.clone());

    env.installer
        .install(&source, Scope::Project, &install_all())
        .unwrap();

    // Second run: everything is already installed.
    let outcomes = env
        .installer
        .install(&source, Scope::Project, &install_all())
        .unwrap();
    assert!(outcomes.iter().all(|o| matches!(
        &o.status,
        OutcomeStatus::Skipped { reason } if reason == "already installed"
    )));

    // Change the hook upstream and force-reinstall.
    write(
        &env.source_dir.join("hooks/fmt.json"),
        r#"{ "name": "fmt", "eventTypes": ["PostToolUse"], "commands": ["cargo fmt"] }"#,
    );
    let outcomes = env
        .installer
        .install(
            &source,
            Scope::Project,
            &InstallOptions {
                force: true,
                install_all: true,
            },
        )
        .unwrap();
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Installed));

    // Still exactly one record per component, with the new content live.
    let config = read_json(&env.project.config_file());
    let extensions = config["extensions"].as_object().unwrap();
    assert_eq!(
        extensions
            .keys()
            .filter(|k| k.starts_with("hook:"))
            .count(),
        1
    );
    let hook_file = read_json(&env.project.root().join("hooks/toolkit/fmt.json"));
    assert_eq!(hook_file["eventTypes"][0], "PostToolUse");
}

#[test]
fn test_force_reinstall_drops_stale_hook_events() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);
    let source = InstallSource::Path(env.source_dir.clone());
    env.installer
        .install(&source, Scope::Project, &install_all())
        .unwrap();

    // The new version subscribes to a different event.
    write(
        &env.source_dir.join("hooks/fmt.json"),
        r#"{ "name": "fmt", "eventTypes": ["PostToolUse"], "commands": ["cargo fmt"] }"#,
    );
    env.installer
        .install(
            &source,
            Scope::Project,
            &InstallOptions {
                force: true,
                install_all: true,
            },
        )
        .unwrap();

    let settings = read_json(&env.project.settings_file());
    let hooks = settings["hooks"].as_object().unwrap();
    assert_eq!(hooks["PostToolUse"][0]["name"], "fmt");
    // The dropped event must not keep firing the hook.
    assert!(!hooks.contains_key("PreToolUse"));
}

#[test]
fn test_remove_without_settings_file_creates_none() {
    let env = setup();
    write(
        &env.source_dir.join("plugin.json"),
        r#"{ "name": "kit", "version": "0.1.0" }"#,
    );
    write(
        &env.source_dir.join("commands/ship.md"),
        "# /ship\n\nShip the release.\n",
    );
    env.installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();
    // A command touches config.json only.
    assert!(!env.project.settings_file().exists());

    env.installer
        .remove(Scope::Project, ExtensionKind::Command, "kit:ship")
        .unwrap();
    assert!(!env.project.settings_file().exists());
}

#[test]
fn test_same_leaf_name_plugins_do_not_collide() {
    let env = setup();
    for plugin in ["alpha", "beta"] {
        let root = env.source_dir.join(plugin);
        write(
            &root.join("plugin.json"),
            &format!(r#"{{ "name": "{plugin}", "version": "0.1.0" }}"#),
        );
        write(
            &root.join("commands/deploy.md"),
            &format!("# /deploy\n\nDeploy from {plugin}.\n"),
        );
    }

    let outcomes = env
        .installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Installed));

    let config = read_json(&env.project.config_file());
    let extensions = config["extensions"].as_object().unwrap();
    assert!(extensions.contains_key("command:alpha:deploy"));
    assert!(extensions.contains_key("command:beta:deploy"));
    assert!(env.project.root().join("commands/alpha/deploy.md").is_file());
    assert!(env.project.root().join("commands/beta/deploy.md").is_file());
}

#[test]
fn test_invalid_sibling_does_not_block_valid_component() {
    let env = setup();
    write(
        &env.source_dir.join("plugin.json"),
        r#"{ "name": "toolkit" }"#,
    );
    write(
        &env.source_dir.join("commands/good.md"),
        "# /good\n\nA valid command.\n",
    );
    // Missing eventTypes: fails validation.
    write(
        &env.source_dir.join("hooks/broken.json"),
        r#"{ "name": "broken", "commands": ["true"] }"#,
    );

    let outcomes = env
        .installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();

    let good = outcomes.iter().find(|o| o.name == "good").unwrap();
    assert_eq!(good.status, OutcomeStatus::Installed);
    let broken = outcomes.iter().find(|o| o.name == "broken").unwrap();
    assert!(matches!(&broken.status, OutcomeStatus::Failed { message }
        if message.contains("HOOK_NO_EVENT_TYPES")));
    assert!(!env.project.root().join("hooks/toolkit/broken.json").exists());
}

#[test]
fn test_security_issue_blocks_unless_forced() {
    let env = setup();
    write(
        &env.source_dir.join("plugin.json"),
        r#"{ "name": "risky" }"#,
    );
    write(
        &env.source_dir.join("hooks/wipe.json"),
        r#"{ "name": "wipe", "eventTypes": ["Stop"], "commands": ["rm -rf /tmp/cache"] }"#,
    );

    let source = InstallSource::Path(env.source_dir.clone());
    let outcomes = env
        .installer
        .install(&source, Scope::Project, &install_all())
        .unwrap();
    assert!(matches!(&outcomes[0].status, OutcomeStatus::Failed { message }
        if message.contains("SECURITY_")));

    let outcomes = env
        .installer
        .install(
            &source,
            Scope::Project,
            &InstallOptions {
                force: true,
                install_all: true,
            },
        )
        .unwrap();
    assert_eq!(outcomes[0].status, OutcomeStatus::Installed);
}

#[test]
fn test_remove_deletes_files_record_and_settings() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);
    env.installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();

    let outcomes = env
        .installer
        .remove(Scope::Project, ExtensionKind::Hook, "toolkit:fmt")
        .unwrap();
    assert_eq!(outcomes[0].status, OutcomeStatus::Removed);

    assert!(!env.project.root().join("hooks/toolkit/fmt.json").exists());
    let config = read_json(&env.project.config_file());
    assert!(
        !config["extensions"]
            .as_object()
            .unwrap()
            .contains_key("hook:toolkit:fmt")
    );
    // The hook's settings entry is gone; the other extensions survive.
    let settings = read_json(&env.project.settings_file());
    assert!(settings.get("hooks").is_none_or(|h| h
        .as_object()
        .is_none_or(|m| !m.contains_key("PreToolUse"))));
    assert!(
        config["extensions"]
            .as_object()
            .unwrap()
            .contains_key("command:toolkit:deploy")
    );
}

#[test]
fn test_remove_unknown_extension_errors() {
    let env = setup();
    let err = env
        .installer
        .remove(Scope::Project, ExtensionKind::Command, "ghost")
        .unwrap_err();
    assert!(matches!(err, ext_core::Error::NotInstalled { .. }));
}

#[test]
fn test_disable_and_enable_flip_settings() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);
    env.installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &install_all(),
        )
        .unwrap();

    let outcomes = env
        .installer
        .disable(Scope::Project, ExtensionKind::Command, "toolkit:deploy")
        .unwrap();
    assert_eq!(outcomes[0].status, OutcomeStatus::Disabled);

    let settings = read_json(&env.project.settings_file());
    assert_eq!(settings["enabled"]["command:toolkit:deploy"], false);
    let config = read_json(&env.project.config_file());
    assert_eq!(
        config["extensions"]["command:toolkit:deploy"]["enabled"],
        false
    );

    env.installer
        .enable(Scope::Project, ExtensionKind::Command, "toolkit:deploy")
        .unwrap();
    let settings = read_json(&env.project.settings_file());
    assert_eq!(settings["enabled"]["command:toolkit:deploy"], true);
}

#[test]
fn test_loose_file_install_detects_kind() {
    let env = setup();
    let file = env.source_dir.join("review.md");
    write(
        &file,
        "---\nname: reviewer\ndescription: Reviews pull requests\ntools:\n  - Read\n---\nYou are a code reviewer.\n",
    );

    let outcomes = env
        .installer
        .install(
            &InstallSource::Path(file),
            Scope::Project,
            &install_all(),
        )
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].kind, Some(ExtensionKind::Agent));
    assert_eq!(outcomes[0].status, OutcomeStatus::Installed);
    assert!(env.project.root().join("agents/review.md").is_file());
}

#[test]
fn test_headless_multi_candidate_install_skips_everything() {
    let env = setup();
    write_toolkit_plugin(&env.source_dir);

    let outcomes = env
        .installer
        .install(
            &InstallSource::Path(env.source_dir.clone()),
            Scope::Project,
            &InstallOptions::default(),
        )
        .unwrap();
    assert!(outcomes.iter().all(|o| matches!(
        &o.status,
        OutcomeStatus::Skipped { reason } if reason == "not selected"
    )));
    assert!(!env.project.config_file().exists());
}

#[test]
fn test_unknown_kind_loose_file_is_rejected() {
    let env = setup();
    let file = env.source_dir.join("mystery.txt");
    write(&file, "nothing recognizable here\n");

    let err = env
        .installer
        .install(&InstallSource::Path(file), Scope::Project, &install_all())
        .unwrap_err();
    assert!(matches!(err, ext_core::Error::UndetectedKind { .. }));
}
