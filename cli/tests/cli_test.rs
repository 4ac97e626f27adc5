use std::path::Path;

mod common;
use common::*;

fn stdout_of(root: &Path, args: &[&str]) -> String {
    let output = pdl(root, args).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

/// Test content:
///     1. list shows every catalog project with its remote
///     2. sync clones one project and list marks it local
///
/// Test tree:
///   cli_list_and_sync
///     ├─remotes
///     │  ├─alpha.git
///     │  └─beta.git
///     └─workspace
///        └─alpha
#[test]
fn cli_list_and_sync() {
    let root = create_test_dir("cli_list_and_sync");
    let alpha = create_remote(&root, "alpha", &[]);
    let beta = create_remote(&root, "beta", &[]);
    create_workspace(&root, &[("alpha", &alpha), ("beta", &beta)]);

    let listed = stdout_of(&root, &["list"]);
    assert!(listed.contains("alpha"));
    assert!(listed.contains("beta"));
    assert!(!listed.contains("[local]"));
    assert!(listed.contains("settings.toml"));

    stdout_of(&root, &["sync", "alpha"]);
    assert!(root.join("workspace/alpha/.git").is_dir());
    assert!(!root.join("workspace/beta").exists());

    let listed = stdout_of(&root, &["list", "--local"]);
    assert!(listed.contains("alpha"));
    assert!(!listed.contains("beta"));
}

/// Test content:
///     1. sync --branch checks out the branch
///     2. switch moves the checkout back to main
///     3. remove --yes deletes the checkout
///
/// Test tree:
///   cli_switch_and_remove
///     ├─remotes
///     │  └─alpha.git (main, feature)
///     └─workspace
///        └─alpha
#[test]
fn cli_switch_and_remove() {
    let root = create_test_dir("cli_switch_and_remove");
    let alpha = create_remote(&root, "alpha", &["feature"]);
    create_workspace(&root, &[("alpha", &alpha)]);
    let checkout = root.join("workspace").join("alpha");

    stdout_of(&root, &["sync", "alpha", "--branch", "feature"]);
    let branch = exec_cmd(&checkout, "git", &["branch", "--show-current"]).unwrap();
    assert_eq!(branch.trim(), "feature");

    stdout_of(&root, &["switch", "alpha", "main"]);
    let branch = exec_cmd(&checkout, "git", &["branch", "--show-current"]).unwrap();
    assert_eq!(branch.trim(), "main");

    stdout_of(&root, &["remove", "alpha", "--yes"]);
    assert!(!checkout.exists());
}

/// Test content:
///     1. an unknown project name fails with a non-zero exit code
///     2. a missing branch fails the sync
///     3. a provider no project offers is rejected
#[test]
fn cli_failures() {
    let root = create_test_dir("cli_failures");
    let alpha = create_remote(&root, "alpha", &[]);
    create_workspace(&root, &[("alpha", &alpha)]);

    let output = pdl(&root, &["sync", "gamma"]).output().unwrap();
    assert!(!output.status.success());

    let output = pdl(&root, &["sync", "alpha", "--branch", "no-such-branch"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let output = pdl(&root, &["sync", "--source", "nowhere", "alpha"]).output().unwrap();
    assert!(!output.status.success());
}

/// Test content:
///     1. --source and --path are saved to the settings file
#[test]
fn cli_sync_saves_settings() {
    let root = create_test_dir("cli_sync_saves_settings");
    let alpha = create_remote(&root, "alpha", &[]);
    create_workspace(&root, &[("alpha", &alpha)]);
    let elsewhere = root.join("elsewhere");

    stdout_of(
        &root,
        &["sync", "--source", "local", "--path", elsewhere.to_str().unwrap(), "alpha"],
    );
    assert!(elsewhere.join("alpha").join(".git").is_dir());

    let settings = std::fs::read_to_string(root.join("settings.toml")).unwrap();
    assert!(settings.contains("elsewhere"));
}
