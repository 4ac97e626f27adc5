#![allow(dead_code)]

use pdl::core::git::{GitCli, Vcs};
use pdl::core::repo::Catalog;
use pdl::core::settings::{ConfigStore, Settings, TomlConfigStore};
use pdl::ops::{ConflictDecision, Coordinator, CoordinatorOptions, CredentialReply, SyncStatus};
use pdl::utils::error::PdlResult;
use pdl::utils::modal::ModalInteraction;
use pdl::utils::progress::ProgressSink;
use pdl::utils::StyleMessage;
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PROVIDER: &str = "local";

pub mod failed_message {
    pub const GIT_INIT: &str = "git init failed";
    pub const GIT_COMMIT: &str = "git commit failed";
    pub const GIT_BRANCH: &str = "git branch failed";
    pub const GIT_CLONE: &str = "git clone failed";
    pub const WRITE_FILE: &str = "write file failed";
}

pub fn exec_cmd(path: impl AsRef<Path>, cmd: &str, args: &[&str]) -> Result<String, anyhow::Error> {
    let output = std::process::Command::new(cmd)
        .current_dir(path)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    match output.status.success() {
        false => Err(anyhow::anyhow!(stderr)),
        true => Ok(stdout),
    }
}

/// fresh `target/tmp/<name>` directory
pub fn create_test_dir(name: &str) -> PathBuf {
    let path = env::current_dir()
        .unwrap()
        .join("target")
        .join("tmp")
        .join(name);
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

fn git_commit(path: &Path, message: &str) {
    exec_cmd(path, "git", &["add", "-A"]).expect(failed_message::GIT_COMMIT);
    exec_cmd(
        path,
        "git",
        &[
            "-c",
            "user.name=pdl",
            "-c",
            "user.email=pdl@example.com",
            "commit",
            "-m",
            message,
        ],
    )
    .expect(failed_message::GIT_COMMIT);
}

/// Bare repository `<root>/remotes/<name>.git` whose HEAD is `main`, plus one
/// branch per entry of `branches`, each with its own commit.
pub fn create_remote(root: &Path, name: &str, branches: &[&str]) -> PathBuf {
    let seed = root.join("seeds").join(name);
    std::fs::create_dir_all(&seed).unwrap();
    exec_cmd(&seed, "git", &["init", "-b", "main"]).expect(failed_message::GIT_INIT);
    std::fs::write(seed.join("README.md"), format!("# {}\n", name)).expect(failed_message::WRITE_FILE);
    git_commit(&seed, "init");

    for branch in branches {
        exec_cmd(&seed, "git", &["checkout", "-b", branch]).expect(failed_message::GIT_BRANCH);
        std::fs::write(seed.join(format!("{}.txt", branch.replace('/', "_"))), branch)
            .expect(failed_message::WRITE_FILE);
        git_commit(&seed, branch);
        exec_cmd(&seed, "git", &["checkout", "main"]).expect(failed_message::GIT_BRANCH);
    }

    let remotes = root.join("remotes");
    std::fs::create_dir_all(&remotes).unwrap();
    let bare = remotes.join(format!("{}.git", name));
    exec_cmd(
        &remotes,
        "git",
        &["clone", "--bare", seed.to_str().unwrap(), bare.to_str().unwrap()],
    )
    .expect(failed_message::GIT_CLONE);
    bare
}

/// catalog with one `local` remote per project
pub fn catalog(projects: &[(&str, &Path)], auth: &[&str]) -> Catalog {
    let mut content = String::new();
    for (name, remote) in projects {
        content += "[[project]]\n";
        content += &format!("name = \"{}\"\n", name);
        if auth.contains(name) {
            content += &format!("auth = [\"{}\"]\n", PROVIDER);
        }
        content += "[project.remotes]\n";
        content += &format!("{} = '{}'\n\n", PROVIDER, remote.display());
    }
    Catalog::from_toml(&content).unwrap()
}

/// settings file pointing the workspace at `<root>/workspace`
pub fn create_store(root: &Path) -> TomlConfigStore {
    let store = TomlConfigStore::new(root.join("settings.toml"));
    let settings = Settings {
        source: PROVIDER.to_string(),
        save_path: root.join("workspace"),
        threads: 2,
        ..Default::default()
    };
    store.save(&settings).unwrap();
    store
}

pub fn workspace(root: &Path) -> PathBuf {
    root.join("workspace")
}

/// Sink keeping everything it is told.
#[derive(Default)]
pub struct TestSink {
    pub logs: RefCell<Vec<String>>,
    pub statuses: RefCell<Vec<(String, SyncStatus)>>,
    pub progress: RefCell<Vec<(String, u8)>>,
    pub batches: RefCell<Vec<(usize, usize, usize)>>,
}

impl TestSink {
    pub fn has_log(&self, pattern: &str) -> bool {
        self.logs.borrow().iter().any(|l| l.contains(pattern))
    }

    pub fn statuses_of(&self, project: &str) -> Vec<SyncStatus> {
        self.statuses
            .borrow()
            .iter()
            .filter(|(p, _)| p == project)
            .map(|(_, s)| *s)
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn on_log(&self, message: &StyleMessage) {
        self.logs.borrow_mut().push(message.to_plain_text());
    }

    fn on_status(&self, project: &str, status: SyncStatus) {
        self.statuses.borrow_mut().push((project.to_string(), status));
    }

    fn on_progress(&self, project: &str, percent: u8, _label: &str) {
        self.progress.borrow_mut().push((project.to_string(), percent));
    }

    fn on_batch_finish(&self, batch: usize, succeeded: usize, failed: usize) {
        self.batches.borrow_mut().push((batch, succeeded, failed));
    }
}

/// Modal answering from queues; an empty queue behaves like a closed prompt.
#[derive(Default)]
pub struct ScriptedModal {
    pub credentials: VecDeque<CredentialReply>,
    pub decisions: VecDeque<ConflictDecision>,
    pub prompts: Vec<String>,
}

impl ScriptedModal {
    pub fn with_credentials(reply: CredentialReply) -> Self {
        Self {
            credentials: VecDeque::from([reply]),
            ..Default::default()
        }
    }

    pub fn with_decision(decision: ConflictDecision) -> Self {
        Self {
            decisions: VecDeque::from([decision]),
            ..Default::default()
        }
    }
}

impl ModalInteraction for ScriptedModal {
    fn prompt_credentials(&mut self, project: &str, _url: &str) -> CredentialReply {
        self.prompts.push(format!("credentials:{}", project));
        self.credentials
            .pop_front()
            .unwrap_or_else(CredentialReply::cancelled)
    }

    fn prompt_conflict(&mut self, project: &str, current: &str, requested: &str) -> ConflictDecision {
        self.prompts
            .push(format!("conflict:{}:{}->{}", project, current, requested));
        self.decisions.pop_front().unwrap_or(ConflictDecision::Abort)
    }
}

/// [`GitCli`] recording how many clones overlap.
#[derive(Default)]
pub struct CountingVcs {
    inner: GitCli,
    running: AtomicUsize,
    pub peak: AtomicUsize,
    pub clones: AtomicUsize,
}

impl Vcs for CountingVcs {
    fn clone_repo(&self, url: &str, dest: &Path, on_line: &mut dyn FnMut(&str)) -> PdlResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.clones.fetch_add(1, Ordering::SeqCst);
        // widen the window in which clones could overlap
        std::thread::sleep(Duration::from_millis(50));
        let result = self.inner.clone_repo(url, dest, on_line);
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn fetch_all(&self, path: &Path) -> PdlResult {
        self.inner.fetch_all(path)
    }

    fn checkout(&self, path: &Path, branch: &str) -> PdlResult {
        self.inner.checkout(path, branch)
    }

    fn checkout_tracking(&self, path: &Path, branch: &str) -> PdlResult {
        self.inner.checkout_tracking(path, branch)
    }

    fn current_branch(&self, path: &Path) -> PdlResult<String> {
        self.inner.current_branch(path)
    }

    fn is_dirty(&self, path: &Path) -> PdlResult<bool> {
        self.inner.is_dirty(path)
    }

    fn discard_changes(&self, path: &Path) -> PdlResult {
        self.inner.discard_changes(path)
    }

    fn list_branches(&self, path: &Path) -> PdlResult<Vec<String>> {
        self.inner.list_branches(path)
    }

    fn remote_heads(&self, url: &str) -> PdlResult<Vec<String>> {
        self.inner.remote_heads(url)
    }
}

/// Vcs that never touches the network: records the urls it is given,
/// fails every clone echoing the url like git does, and answers
/// `ls-remote` with `heads`.
#[derive(Default)]
pub struct RecordingVcs {
    pub clone_urls: Mutex<Vec<String>>,
    pub remote_urls: Mutex<Vec<String>>,
    pub heads: Vec<String>,
}

impl RecordingVcs {
    pub fn with_heads(heads: &[&str]) -> Self {
        Self {
            heads: heads.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl Vcs for RecordingVcs {
    fn clone_repo(&self, url: &str, _dest: &Path, _on_line: &mut dyn FnMut(&str)) -> PdlResult {
        self.clone_urls.lock().unwrap().push(url.to_string());
        Err(anyhow::anyhow!("fatal: unable to access '{}': The requested URL returned error: 403", url))
    }

    fn fetch_all(&self, _path: &Path) -> PdlResult {
        Ok(())
    }

    fn checkout(&self, _path: &Path, _branch: &str) -> PdlResult {
        Ok(())
    }

    fn checkout_tracking(&self, _path: &Path, _branch: &str) -> PdlResult {
        Ok(())
    }

    fn current_branch(&self, _path: &Path) -> PdlResult<String> {
        Ok("main".to_string())
    }

    fn is_dirty(&self, _path: &Path) -> PdlResult<bool> {
        Ok(false)
    }

    fn discard_changes(&self, _path: &Path) -> PdlResult {
        Ok(())
    }

    fn list_branches(&self, _path: &Path) -> PdlResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn remote_heads(&self, url: &str) -> PdlResult<Vec<String>> {
        self.remote_urls.lock().unwrap().push(url.to_string());
        match self.heads.is_empty() {
            true => Err(anyhow::anyhow!("fatal: could not read from '{}'", url)),
            false => Ok(self.heads.clone()),
        }
    }
}

/// catalog of one project behind an https provider that needs credentials
pub fn auth_catalog(name: &str) -> Catalog {
    let content = format!(
        "[[project]]\nname = \"{name}\"\nauth = [\"{provider}\"]\n[project.remotes]\n{provider} = \"https://git.example.com/base/{name}.git\"\n",
        name = name,
        provider = PROVIDER
    );
    Catalog::from_toml(&content).unwrap()
}

pub type TestCoordinator = Coordinator<TestSink, ScriptedModal>;

pub fn test_options(threads: usize) -> CoordinatorOptions {
    CoordinatorOptions {
        threads: Some(threads),
        request_timeout: Duration::from_secs(20),
        tick: Duration::from_millis(10),
    }
}

pub fn create_coordinator(
    root: &Path,
    catalog: &Catalog,
    vcs: Arc<dyn Vcs>,
    modal: ScriptedModal,
    threads: usize,
) -> TestCoordinator {
    Coordinator::new(
        catalog,
        Box::new(create_store(root)),
        vcs,
        TestSink::default(),
        modal,
        test_options(threads),
    )
    .unwrap()
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn branch_set(branches: &[&str]) -> BTreeSet<String> {
    branches.iter().map(|b| b.to_string()).collect()
}
