use anyhow::anyhow;
use clap::Args;

use pdl::ops::{ConflictDecision, SyncStatus};
use pdl::utils::error::PdlResult;

use crate::commands::Workspace;
use crate::CliCommand;

#[derive(Debug, Clone, Default, Args)]
/// Switch a downloaded project to another branch
pub(crate) struct SwitchCommand {
    /// Project name
    pub project: String,

    /// Target branch, local or remote
    pub branch: String,

    /// Discard local changes without prompt
    #[arg(long, conflicts_with = "keep")]
    pub force: bool,

    /// Keep local changes and stay on the current branch without prompt
    #[arg(long)]
    pub keep: bool,
}

impl SwitchCommand {
    fn preset_decision(&self) -> Option<ConflictDecision> {
        match (self.force, self.keep) {
            (true, _) => Some(ConflictDecision::Force),
            (_, true) => Some(ConflictDecision::Cancel),
            _ => None,
        }
    }
}

impl CliCommand for SwitchCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult {
        let mut coordinator = workspace.coordinator(Some(1), self.preset_decision())?;
        coordinator.request_branch(&self.project, &self.branch)?;
        coordinator.run_until_idle();

        match coordinator.project(&self.project) {
            Some(state) if state.sync_status == SyncStatus::Failed => {
                Err(anyhow!("{}: switch to {} failed", self.project, self.branch))
            }
            _ => Ok(()),
        }
    }
}
