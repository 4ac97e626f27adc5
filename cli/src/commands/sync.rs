use clap::Args;
use std::path::PathBuf;

use pdl::utils::error::PdlResult;

use crate::commands::{check_failed, select, Workspace};
use crate::CliCommand;

#[derive(Debug, Clone, Default, Args)]
/// Clone projects from the selected provider
pub(crate) struct SyncCommand {
    /// Project names or glob patterns
    pub projects: Vec<String>,

    /// Sync every catalog project
    #[arg(long)]
    pub all: bool,

    /// Switch provider, saved for later runs
    #[arg(long, value_name = "PROVIDER")]
    pub source: Option<String>,

    /// Change the download directory, saved for later runs
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Sets the number of threads to be used
    #[arg(short, long, value_name = "NUMBER")]
    pub thread: Option<usize>,

    /// Branch to check out after clone
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,
}

impl CliCommand for SyncCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult {
        let mut coordinator = workspace.coordinator(self.thread, None)?;
        if let Some(source) = &self.source {
            coordinator.set_source(source)?;
        }
        if let Some(path) = &self.path {
            coordinator.set_save_path(path)?;
        }

        let names = select(&coordinator, &self.projects, self.all)?;
        if let Some(branch) = &self.branch {
            for name in &names {
                coordinator.set_requested_branch(name, branch)?;
            }
        }

        coordinator.sync(&names)?;
        coordinator.run_until_idle();
        check_failed(&coordinator, &names, "sync")
    }
}
