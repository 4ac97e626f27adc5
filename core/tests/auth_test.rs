use pdl::ops::{CredentialReply, SyncStatus};
use std::sync::Arc;

use crate::common::{
    auth_catalog, branch_set, create_coordinator, create_test_dir, names, RecordingVcs,
    ScriptedModal,
};

mod common;

const USER: &str = "ut@dev";
const PASSWORD: &str = "p@ss word";
const ENCODED_PASSWORD: &str = "p%40ss%20word";

fn assert_no_password(logs: &[String]) {
    for line in logs {
        assert!(!line.contains(PASSWORD), "password leaked: {}", line);
        assert!(!line.contains(ENCODED_PASSWORD), "password leaked: {}", line);
    }
}

/// Test content:
///     1. credentials typed for an auth-only project reach the clone url
///     2. the clone fails and echoes the url, the log never shows the password
#[test]
fn sync_with_credentials_hides_password() {
    let path = create_test_dir("sync_with_credentials_hides_password");
    let catalog = auth_catalog("os-config");

    let vcs = Arc::new(RecordingVcs::default());
    let modal = ScriptedModal::with_credentials(CredentialReply::provided(USER, PASSWORD));
    let mut coordinator = create_coordinator(&path, &catalog, vcs.clone(), modal, 2);
    coordinator.sync(&names(&["os-config"])).unwrap();
    coordinator.run_until_idle();

    let urls = vcs.clone_urls.lock().unwrap().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://ut%40dev:"));
    assert!(urls[0].contains(ENCODED_PASSWORD));

    assert_eq!(coordinator.modal().prompts, vec!["credentials:os-config"]);
    assert_eq!(
        coordinator.project("os-config").unwrap().sync_status,
        SyncStatus::Failed
    );
    assert!(coordinator.sink().has_log("403"));
    assert_no_password(&coordinator.sink().logs.borrow());

    drop(coordinator);
    std::fs::remove_dir_all(&path).unwrap();
}

/// Test content:
///     1. branch query on an auth-only project asks for credentials
///     2. `ls-remote` gets the credential url and the heads are stored
#[test]
fn query_branches_with_credentials() {
    let path = create_test_dir("query_branches_with_credentials");
    let catalog = auth_catalog("os-config");

    let vcs = Arc::new(RecordingVcs::with_heads(&["main", "uos"]));
    let modal = ScriptedModal::with_credentials(CredentialReply::provided(USER, PASSWORD));
    let mut coordinator = create_coordinator(&path, &catalog, vcs.clone(), modal, 2);
    coordinator.query_branches(&names(&["os-config"])).unwrap();
    coordinator.run_until_idle();

    let urls = vcs.remote_urls.lock().unwrap().clone();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://ut%40dev:"));
    assert_eq!(coordinator.modal().prompts, vec!["credentials:os-config"]);
    assert_eq!(
        coordinator.project("os-config").unwrap().available_branches,
        branch_set(&["main", "uos"])
    );

    drop(coordinator);
    std::fs::remove_dir_all(&path).unwrap();
}

/// Test content:
///     1. cancelling the prompt skips `ls-remote` entirely
///     2. a failing `ls-remote` after authentication is logged without the password
#[test]
fn query_branches_cancelled_or_failed() {
    let path = create_test_dir("query_branches_cancelled_or_failed");
    let catalog = auth_catalog("os-config");
    let project = names(&["os-config"]);

    let vcs = Arc::new(RecordingVcs::with_heads(&["main"]));
    let mut coordinator =
        create_coordinator(&path, &catalog, vcs.clone(), ScriptedModal::default(), 2);
    coordinator.query_branches(&project).unwrap();
    coordinator.run_until_idle();

    assert!(vcs.remote_urls.lock().unwrap().is_empty());
    assert!(coordinator.sink().has_log("[cancelled]"));
    assert!(coordinator.project("os-config").unwrap().available_branches.is_empty());
    drop(coordinator);

    let vcs = Arc::new(RecordingVcs::default());
    let modal = ScriptedModal::with_credentials(CredentialReply::provided(USER, PASSWORD));
    let mut coordinator = create_coordinator(&path, &catalog, vcs.clone(), modal, 2);
    coordinator.query_branches(&project).unwrap();
    coordinator.run_until_idle();

    assert_eq!(vcs.remote_urls.lock().unwrap().len(), 1);
    assert!(coordinator.sink().has_log("query remote branches failed"));
    assert_no_password(&coordinator.sink().logs.borrow());

    drop(coordinator);
    std::fs::remove_dir_all(&path).unwrap();
}
