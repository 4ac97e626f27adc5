use clap::Args;
use console::Term;

use pdl::utils::error::PdlResult;
use pdl::utils::style_message::{StyleMessage, YELLOW};

use crate::commands::{select, Workspace};
use crate::CliCommand;

#[derive(Debug, Clone, Default, Args)]
/// Delete local checkouts
pub(crate) struct RemoveCommand {
    /// Project names or glob patterns
    pub projects: Vec<String>,

    /// Remove every downloaded project
    #[arg(long)]
    pub all: bool,

    /// Remove without prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl CliCommand for RemoveCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult {
        let mut coordinator = workspace.coordinator(Some(1), None)?;
        let names = select(&coordinator, &self.projects, self.all)?
            .into_iter()
            .filter(|name| {
                coordinator
                    .project(name)
                    .map_or(false, |state| state.local_path.exists())
            })
            .collect::<Vec<_>>();

        if names.is_empty() {
            println!("nothing to remove");
            return Ok(());
        }

        if !self.yes && !confirm(&names)? {
            println!("remove cancelled");
            return Ok(());
        }

        let removed = coordinator.remove_local(&names)?;
        println!("{} local checkouts removed", removed);
        Ok(())
    }
}

fn confirm(names: &[String]) -> PdlResult<bool> {
    let term = Term::stderr();
    let question = StyleMessage::new()
        .plain_text("remove ")
        .styled_text(names.join(", "), &YELLOW)
        .plain_text("? [y/N] ");
    term.write_str(&question.to_string())?;

    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
