use anyhow::anyhow;
use indicatif::MultiProgress;
use std::path::PathBuf;
use std::sync::Arc;

use pdl::core::git::GitCli;
use pdl::core::repo::Catalog;
use pdl::core::settings::TomlConfigStore;
use pdl::ops::{ConflictDecision, Coordinator, CoordinatorOptions, SyncStatus};
use pdl::utils::error::PdlResult;

use crate::utils::modal::TermModal;
use crate::utils::progress::TermSink;

mod branches;
mod list;
mod remove;
mod switch;
mod sync;

pub(crate) use branches::BranchesCommand;
pub(crate) use list::ListCommand;
pub(crate) use remove::RemoveCommand;
pub(crate) use switch::SwitchCommand;
pub(crate) use sync::SyncCommand;

pub(crate) type TermCoordinator = Coordinator<TermSink, TermModal>;

/// Catalog and settings locations shared by every command.
#[derive(Debug, Clone, Default)]
pub(crate) struct Workspace {
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl Workspace {
    pub(crate) fn new(catalog: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        Self { catalog, config }
    }

    pub(crate) fn load_catalog(&self) -> PdlResult<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::load(path),
            None => Catalog::builtin(),
        }
    }

    pub(crate) fn store(&self) -> TomlConfigStore {
        match &self.config {
            Some(path) => TomlConfigStore::new(path),
            None => TomlConfigStore::default(),
        }
    }

    pub(crate) fn coordinator(
        &self,
        threads: Option<usize>,
        decision: Option<ConflictDecision>,
    ) -> PdlResult<TermCoordinator> {
        let multi_progress = MultiProgress::new();
        let sink = TermSink::new(multi_progress.clone());
        let modal = TermModal::new(multi_progress).with_decision(decision);
        let options = CoordinatorOptions {
            threads,
            ..CoordinatorOptions::default()
        };

        Coordinator::new(
            &self.load_catalog()?,
            Box::new(self.store()),
            Arc::new(GitCli::default()),
            sink,
            modal,
            options,
        )
    }
}

/// Selected names: explicit patterns, every project with `all`, none otherwise.
pub(crate) fn select(coordinator: &TermCoordinator, patterns: &[String], all: bool) -> PdlResult<Vec<String>> {
    if all {
        return coordinator.select(&[]);
    }
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    coordinator.select(patterns)
}

/// Error out when any of `names` ended in [`SyncStatus::Failed`].
pub(crate) fn check_failed(coordinator: &TermCoordinator, names: &[String], action: &str) -> PdlResult {
    let failed = names
        .iter()
        .filter_map(|name| coordinator.project(name))
        .filter(|state| state.sync_status == SyncStatus::Failed)
        .map(|state| state.name().to_string())
        .collect::<Vec<_>>();

    match failed.is_empty() {
        true => Ok(()),
        false => Err(anyhow!("{} failed: {}", action, failed.join(", "))),
    }
}
