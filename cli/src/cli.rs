use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::*;

#[derive(Parser)]
#[command(
    name = "pdl",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help(true)
)]
pub(crate) struct Cli {
    /// Use specified project catalog instead of the builtin one
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Use specified settings file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// List catalog projects
    List(ListCommand),

    /// Clone projects from the selected provider
    Sync(SyncCommand),

    /// List remote and local branches
    Branches(BranchesCommand),

    /// Switch a downloaded project to another branch
    Switch(SwitchCommand),

    /// Delete local checkouts
    Remove(RemoveCommand),
}
