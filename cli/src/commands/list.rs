use clap::Args;

use pdl::utils::error::PdlResult;
use pdl::utils::path::PathExtension;
use pdl::utils::style_message::{StyleMessage, BLUE, GREEN, GREY};

use crate::commands::Workspace;
use crate::CliCommand;

#[derive(Debug, Clone, Default, Args)]
/// List catalog projects
pub(crate) struct ListCommand {
    /// Only show projects with a local checkout
    #[arg(long)]
    pub local: bool,
}

impl CliCommand for ListCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult {
        let coordinator = workspace.coordinator(Some(1), None)?;
        let settings = coordinator.settings();
        println!(
            "source: {}, save path: {}, settings: {}",
            settings.source,
            settings.save_path.display_path(),
            workspace.store().path().display_path()
        );

        for state in coordinator.projects() {
            if self.local && !state.exists_locally {
                continue;
            }

            let mut line = StyleMessage::project(state.name()).plain_text(" ");
            line = match state.remote_url() {
                Some(url) => line.styled_text(url, &BLUE),
                None => line.styled_text(format!("<no {} remote>", state.selected_provider), &GREY),
            };
            if state.exists_locally {
                line = line.plain_text(" ").styled_text("[local]", &GREEN);
            }
            if !state.requested_branch.is_empty() {
                line = line.plain_text(format!(" branch: {}", state.requested_branch));
            }
            println!("{}", line);
        }
        Ok(())
    }
}
