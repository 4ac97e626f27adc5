use anyhow::anyhow;
use globset::{Glob, GlobSetBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::core::git::Vcs;
use crate::core::repo::Catalog;
use crate::core::settings::{ConfigStore, Settings};
use crate::core::state::{ProjectState, SyncStatus};
use crate::ops::bridge::{CredentialBridge, Reply, DEFAULT_REQUEST_TIMEOUT};
use crate::ops::bus::{BusEvent, MessageBus, SwitchOutcome};
use crate::ops::pool::{BatchHandle, Job, WorkerPool};
use crate::ops::query::BranchQueryJob;
use crate::ops::reconcile::{plan, SwitchJob, SwitchPlan};
use crate::ops::sync::SyncTask;
use crate::ops::TaskContext;
use crate::utils::error::{PdlError, PdlResult};
use crate::utils::modal::ModalInteraction;
use crate::utils::path::PathExtension;
use crate::utils::progress::ProgressSink;
use crate::utils::StyleMessage;

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// pool width, the saved setting when `None`
    pub threads: Option<usize>,
    pub request_timeout: Duration,
    pub tick: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            threads: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tick: DEFAULT_TICK,
        }
    }
}

/// Single owner of every [`ProjectState`].
///
/// Workers only publish events; [`Coordinator::tick`] applies them on the
/// calling thread, which is also the only thread that opens prompts.
pub struct Coordinator<S: ProgressSink, M: ModalInteraction> {
    bus: MessageBus,
    bridge: Arc<CredentialBridge>,
    pool: WorkerPool,
    vcs: Arc<dyn Vcs>,
    store: Box<dyn ConfigStore>,
    settings: Settings,
    projects: BTreeMap<String, ProjectState>,
    providers: BTreeSet<String>,
    active_batches: BTreeSet<usize>,
    handles: Vec<BatchHandle>,
    sink: S,
    modal: M,
    options: CoordinatorOptions,
}

impl<S: ProgressSink, M: ModalInteraction> Coordinator<S, M> {
    /// Fails when the catalog is empty or the settings cannot be read.
    pub fn new(
        catalog: &Catalog,
        store: Box<dyn ConfigStore>,
        vcs: Arc<dyn Vcs>,
        sink: S,
        modal: M,
        options: CoordinatorOptions,
    ) -> PdlResult<Self> {
        if catalog.is_empty() {
            return Err(anyhow!(PdlError::CatalogEmpty));
        }

        let settings = store.load()?;
        let root = settings.save_path.expand_home();
        let projects = catalog
            .projects()
            .iter()
            .map(|descriptor| {
                let preferred = settings.branches.get(&descriptor.name).map(String::as_str);
                let state = ProjectState::new(descriptor.clone(), &settings.source, &root, preferred);
                (descriptor.name.clone(), state)
            })
            .collect();

        let providers = catalog.providers().into_iter().map(str::to_string).collect();

        let bus = MessageBus::new();
        let bridge = Arc::new(CredentialBridge::new(bus.sender()));
        let pool = WorkerPool::new(options.threads.unwrap_or(settings.threads), bus.sender())?;
        log::debug!("coordinator ready, pool width {}", pool.width());

        Ok(Self {
            bus,
            bridge,
            pool,
            vcs,
            store,
            settings,
            projects,
            providers,
            active_batches: BTreeSet::new(),
            handles: Vec::new(),
            sink,
            modal,
            options,
        })
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectState> {
        self.projects.values()
    }

    pub fn project(&self, name: &str) -> Option<&ProjectState> {
        self.projects.get(name)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn modal(&self) -> &M {
        &self.modal
    }

    /// Names matching `patterns` (exact names or globs), every project when empty.
    pub fn select(&self, patterns: &[String]) -> PdlResult<Vec<String>> {
        if patterns.is_empty() {
            return Ok(self.projects.keys().cloned().collect());
        }

        let mut builder = GlobSetBuilder::new();
        let mut exact = BTreeSet::new();
        for pattern in patterns {
            if pattern.contains(&['*', '?', '[', '{'][..]) {
                builder.add(Glob::new(pattern)?);
            } else {
                self.state(pattern)?;
                exact.insert(pattern.as_str());
            }
        }
        let globs = builder.build()?;

        Ok(self
            .projects
            .keys()
            .filter(|name| exact.contains(name.as_str()) || globs.is_match(name.as_str()))
            .cloned()
            .collect())
    }

    pub fn set_source(&mut self, provider: &str) -> PdlResult {
        if !self.providers.contains(provider) {
            return Err(anyhow!(PdlError::UnknownProvider(
                StyleMessage::provider_not_found(provider)
            )));
        }

        self.settings.source = provider.to_string();
        for state in self.projects.values_mut() {
            state.selected_provider = provider.to_string();
        }
        self.store.save(&self.settings)
    }

    pub fn set_save_path(&mut self, path: impl AsRef<Path>) -> PdlResult {
        self.settings.save_path = path.as_ref().to_path_buf();
        let root = self.settings.save_path.expand_home();
        for state in self.projects.values_mut() {
            state.set_root(&root);
        }
        self.store.save(&self.settings)
    }

    /// Change the branch the next sync aims for. Never starts a switch.
    pub fn set_requested_branch(&mut self, name: &str, branch: &str) -> PdlResult {
        self.state_mut(name)?.requested_branch = branch.trim().to_string();
        Ok(())
    }

    /// Clone every named project afresh, returns the batch id.
    pub fn sync(&mut self, names: &[String]) -> PdlResult<usize> {
        self.ensure_known(names)?;

        let mut jobs: Vec<Box<dyn Job>> = Vec::new();
        for name in names {
            let ctx = self.task_context();
            let Some(state) = self.projects.get_mut(name) else {
                continue;
            };
            if state.switching || state.sync_status.is_busy() {
                let message = StyleMessage::project_busy(name);
                log::info!("{}", message.to_plain_text());
                self.sink.on_log(&message);
                continue;
            }
            let Some(url) = state.remote_url().map(str::to_string) else {
                let message = StyleMessage::no_remote_for_provider(name, &state.selected_provider);
                state.sync_status = SyncStatus::Failed;
                log::warn!("{}", message.to_plain_text());
                self.sink.on_log(&message);
                self.sink.on_status(name, SyncStatus::Failed);
                continue;
            };

            // busy from the moment the job is queued, not from its first event
            state.sync_status = SyncStatus::Cloning;
            state.progress_percent = 0;
            state.progress_label.clear();
            jobs.push(Box::new(SyncTask::new(state, url, ctx)));
            self.sink.on_status(name, SyncStatus::Cloning);
        }

        let handle = self.pool.run_batch("sync", jobs);
        Ok(self.track(handle))
    }

    /// List remote and local branches of every named project.
    pub fn query_branches(&mut self, names: &[String]) -> PdlResult<usize> {
        self.ensure_known(names)?;

        let jobs = names
            .iter()
            .filter_map(|name| self.projects.get(name))
            .map(|state| Box::new(BranchQueryJob::new(state, self.task_context())) as Box<dyn Job>)
            .collect();

        let handle = self.pool.run_batch("query branches", jobs);
        Ok(self.track(handle))
    }

    /// Move a project to `branch`.
    ///
    /// Requests while a switch runs are ignored. A project without a local
    /// checkout only records the preference for its next sync.
    pub fn request_branch(&mut self, name: &str, branch: &str) -> PdlResult {
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(anyhow!("{}: empty branch name", name));
        }

        let ctx = self.task_context();
        let state = self.state_mut(name)?;

        match plan(state.switching, state.current_branch.as_deref(), branch, false) {
            SwitchPlan::Ignore => {
                log::debug!("{}", PdlError::ReentrancyRejected(name.to_string()));
                self.emit(StyleMessage::switch_rejected(name));
                return Ok(());
            }
            SwitchPlan::NoOp if state.exists_locally => {
                self.emit(StyleMessage::switch_unchanged(name, branch));
                return Ok(());
            }
            _ => {}
        }

        if state.sync_status.is_busy() {
            self.emit(StyleMessage::project_busy(name));
            return Ok(());
        }

        if !state.exists_locally {
            state.requested_branch = branch.to_string();
            self.settings
                .branches
                .insert(name.to_string(), branch.to_string());
            self.store.save(&self.settings)?;
            self.emit(StyleMessage::branch_preference_saved(name, branch));
            return Ok(());
        }

        state.switching = true;
        state.requested_branch = branch.to_string();
        state.sync_status = SyncStatus::Switching;
        let job = SwitchJob::new(state, branch, ctx);
        self.sink.on_status(name, SyncStatus::Switching);

        let handle = self.pool.run_batch("switch", vec![Box::new(job)]);
        self.track(handle);
        Ok(())
    }

    /// Delete local checkouts, returns how many were removed.
    pub fn remove_local(&mut self, names: &[String]) -> PdlResult<usize> {
        self.ensure_known(names)?;

        let mut removed = 0;
        let mut errors = Vec::new();
        for name in names {
            let Some(state) = self.projects.get_mut(name) else {
                continue;
            };
            if state.switching || state.sync_status.is_busy() {
                let message = StyleMessage::project_busy(name);
                self.sink.on_log(&message);
                continue;
            }
            if !state.local_path.exists() {
                continue;
            }

            match std::fs::remove_dir_all(&state.local_path) {
                Ok(()) => {
                    removed += 1;
                    state.refresh_local();
                    state.sync_status = SyncStatus::Idle;
                    state.progress_percent = 0;
                    let message = StyleMessage::remove_dir_succ(&state.local_path);
                    log::info!("{}", message.to_plain_text());
                    self.sink.on_log(&message);
                    self.sink.on_status(name, SyncStatus::Idle);
                }
                Err(e) => errors.push(StyleMessage::remove_dir_failed(&state.local_path, &e.into())),
            }
        }

        if !errors.is_empty() {
            return Err(anyhow!(PdlError::OpsError {
                prefix: StyleMessage::new().plain_text("remove local checkouts failed!"),
                errors: errors.into(),
            }));
        }
        Ok(removed)
    }

    /// Drain the bus once and apply every event. Returns the number handled.
    pub fn tick(&mut self) -> usize {
        let events = self.bus.drain();
        let count = events.len();
        for event in events {
            self.apply(event);
        }
        self.reap_batches();
        count
    }

    /// no batch is running
    pub fn is_idle(&self) -> bool {
        self.active_batches.is_empty()
    }

    /// Tick until every started batch has reported completion.
    pub fn run_until_idle(&mut self) {
        loop {
            self.tick();
            if self.is_idle() {
                break;
            }
            thread::sleep(self.options.tick);
        }
    }

    /// Release workers blocked on a prompt; later requests are cancelled.
    pub fn shutdown(&self) {
        self.bridge.shutdown();
    }

    fn apply(&mut self, event: BusEvent) {
        match event {
            BusEvent::Log(message) => self.emit(message),
            BusEvent::StatusChanged { project, status } => {
                if let Some(state) = self.projects.get_mut(&project) {
                    state.sync_status = status;
                }
                self.sink.on_status(&project, status);
            }
            BusEvent::ProgressChanged {
                project,
                percent,
                label,
            } => {
                if let Some(state) = self.projects.get_mut(&project) {
                    state.progress_percent = percent;
                    state.progress_label = label.clone();
                }
                self.sink.on_progress(&project, percent, &label);
            }
            BusEvent::BranchesDiscovered { project, branches } => {
                if let Some(state) = self.projects.get_mut(&project) {
                    state.available_branches = branches;
                    let saved = self.settings.branches.get(&project).map(String::as_str);
                    if let Some(branch) = state.default_branch(saved) {
                        state.requested_branch = branch;
                    }
                    self.sink.on_branches(&project, &state.available_branches);
                }
            }
            BusEvent::CurrentBranch { project, branch } => {
                if let Some(state) = self.projects.get_mut(&project) {
                    state.current_branch = Some(branch);
                }
            }
            BusEvent::CredentialRequest { id, project, url } => {
                let reply = self.modal.prompt_credentials(&project, &url);
                self.bus
                    .sender()
                    .publish(BusEvent::CredentialResolved { id, reply });
            }
            BusEvent::CredentialResolved { id, reply } => {
                if !self.bridge.fulfil(id, Reply::Credentials(reply)) {
                    log::warn!("credential request {} already resolved or expired", id);
                }
            }
            BusEvent::BranchConflict {
                id,
                project,
                current,
                requested,
            } => {
                let decision = self.modal.prompt_conflict(&project, &current, &requested);
                let sender = self.bus.sender();
                sender.log(StyleMessage::conflict_decision(&project, decision.to_string()));
                sender.publish(BusEvent::BranchConflictResolved {
                    id,
                    project,
                    decision,
                });
            }
            BusEvent::BranchConflictResolved { id, project, decision } => {
                if !self.bridge.fulfil(id, Reply::Conflict(decision)) {
                    log::warn!("{}: conflict request {} already resolved or expired", project, id);
                }
            }
            BusEvent::SwitchFinished { project, outcome } => self.finish_switch(&project, outcome),
            BusEvent::RefreshLocal { project } => {
                if let Some(state) = self.projects.get_mut(&project) {
                    state.refresh_local();
                }
            }
            BusEvent::BatchFinished {
                batch,
                succeeded,
                failed,
            } => {
                self.active_batches.remove(&batch);
                self.sink.on_batch_finish(batch, succeeded, failed);
            }
        }
    }

    fn finish_switch(&mut self, project: &str, outcome: SwitchOutcome) {
        let Some(state) = self.projects.get_mut(project) else {
            return;
        };
        state.switching = false;

        let mut keep_branch = |branch: Option<&String>| {
            if let Some(branch) = branch {
                state.current_branch = Some(branch.clone());
                state.requested_branch = branch.clone();
            }
        };

        let (status, message, save) = match &outcome {
            SwitchOutcome::Unchanged { branch } => {
                keep_branch(Some(branch));
                (SyncStatus::Idle, StyleMessage::switch_unchanged(project, branch), false)
            }
            SwitchOutcome::Switched { branch } => {
                keep_branch(Some(branch));
                self.settings
                    .branches
                    .insert(project.to_string(), branch.clone());
                (SyncStatus::Succeeded, StyleMessage::switch_succ(project, branch), true)
            }
            SwitchOutcome::Cancelled { current } => {
                keep_branch(current.as_ref());
                let message = StyleMessage::switch_cancelled(project, current.as_deref());
                (SyncStatus::Idle, message, false)
            }
            SwitchOutcome::RolledBack { current, reason } => {
                keep_branch(current.as_ref());
                let message = StyleMessage::switch_rolled_back(project, current.as_deref(), reason);
                (SyncStatus::Failed, message, false)
            }
        };
        state.sync_status = status;

        self.sink.on_status(project, status);
        self.emit(message);
        if save {
            if let Err(e) = self.store.save(&self.settings) {
                log::error!("save settings failed: {:#}", e);
                self.sink.on_log(&StyleMessage::git_error(project, &e));
            }
        }
    }

    /// mirror a message to the log and the sink
    fn emit(&self, message: StyleMessage) {
        if message.is_empty() {
            return;
        }
        log::info!("{}", message.to_plain_text());
        self.sink.on_log(&message);
    }

    fn reap_batches(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.handles.drain(..).partition(BatchHandle::is_finished);
        self.handles = running;

        for handle in finished {
            let id = handle.id();
            // a dispatcher that died never publishes BatchFinished
            if let Err(e) = handle.join() {
                log::error!("{:#}", e);
                self.active_batches.remove(&id);
            }
        }
    }

    fn track(&mut self, handle: BatchHandle) -> usize {
        let id = handle.id();
        self.active_batches.insert(id);
        self.handles.push(handle);
        id
    }

    fn task_context(&self) -> TaskContext {
        TaskContext {
            bus: self.bus.sender(),
            bridge: self.bridge.clone(),
            vcs: self.vcs.clone(),
            request_timeout: self.options.request_timeout,
        }
    }

    fn ensure_known(&self, names: &[String]) -> PdlResult {
        names.iter().try_for_each(|name| self.state(name).map(|_| ()))
    }

    fn state(&self, name: &str) -> PdlResult<&ProjectState> {
        self.projects.get(name).ok_or_else(|| unknown_project(name))
    }

    fn state_mut(&mut self, name: &str) -> PdlResult<&mut ProjectState> {
        self.projects.get_mut(name).ok_or_else(|| unknown_project(name))
    }
}

impl<S: ProgressSink, M: ModalInteraction> Drop for Coordinator<S, M> {
    fn drop(&mut self) {
        self.bridge.shutdown();
    }
}

fn unknown_project(name: &str) -> anyhow::Error {
    anyhow!(PdlError::UnknownProject(StyleMessage::project_not_found(name)))
}
