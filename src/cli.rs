use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commandeer")]
#[command(version)]
#[command(about = "Declarative lifecycle management for command-backed resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// State file path (defaults to ~/.local/state/commandeer/state.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the resource, or update it when change detection requires it
    Apply(ApplyArgs),

    /// Show what apply would do, without running create or update
    Plan(SpecArgs),

    /// Run the recorded read command and refresh the observed output
    Read(SpecArgs),

    /// Run the recorded delete command and drop the resource from state
    Destroy(DestroyArgs),

    /// List resources tracked in the state file
    State,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct SpecArgs {
    /// Resource spec file (.toml or .json)
    pub spec: PathBuf,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Resource spec file (.toml or .json)
    pub spec: PathBuf,

    /// Report the decision without executing create or update
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct DestroyArgs {
    /// Resource spec file (.toml or .json)
    pub spec: PathBuf,

    /// Drop the resource from state even if its delete command fails
    #[arg(long)]
    pub force: bool,
}
