use clap::Args;

use pdl::utils::error::PdlResult;

use crate::commands::{select, Workspace};
use crate::CliCommand;

#[derive(Debug, Clone, Default, Args)]
/// List remote and local branches
pub(crate) struct BranchesCommand {
    /// Project names or glob patterns
    pub projects: Vec<String>,

    /// Query every catalog project
    #[arg(long)]
    pub all: bool,

    /// Sets the number of threads to be used
    #[arg(short, long, value_name = "NUMBER")]
    pub thread: Option<usize>,
}

impl CliCommand for BranchesCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult {
        let mut coordinator = workspace.coordinator(self.thread, None)?;
        coordinator.sink().show_branches();

        let names = select(&coordinator, &self.projects, self.all)?;
        coordinator.query_branches(&names)?;
        coordinator.run_until_idle();
        Ok(())
    }
}
