mod cli;
mod commands;
mod utils;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::Workspace;
use pdl::utils::error::PdlResult;

pub(crate) trait CliCommand {
    fn exec(self, workspace: &Workspace) -> PdlResult;
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = utils::logger::init_log() {
        eprintln!("log disabled: {:#}", e);
    }

    let workspace = Workspace::new(cli.catalog, cli.config);
    let result = match cli.command {
        Commands::List(command) => command.exec(&workspace),
        Commands::Sync(command) => command.exec(&workspace),
        Commands::Branches(command) => command.exec(&workspace),
        Commands::Switch(command) => command.exec(&workspace),
        Commands::Remove(command) => command.exec(&workspace),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
