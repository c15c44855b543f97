// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "capstan")]
#[command(about = "Atomic symlink-switching release deploys with rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print machine-readable JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new capstan.yml configuration file
    Init {
        /// Application name
        #[arg(long)]
        app: Option<String>,

        /// Base directory releases are deployed under (absolute)
        #[arg(long)]
        deploy_dir: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Install a release archive and switch `current` to it
    Deploy(DeployArgs),

    /// Show the live release and deploy history
    Status {
        /// Target destination (defined in config)
        #[arg(short, long)]
        destination: Option<String>,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    /// Release archive (anything `tar xf` can read)
    pub archive: PathBuf,

    /// Target destination (defined in config)
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Redeploy even if this commit is already live
    #[arg(short, long)]
    pub force: bool,

    /// Release timestamp (defaults to now, formatted with timestamp_format)
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Short commit hash to stamp the release with
    #[arg(long, conflicts_with = "scm_from")]
    pub scm_hash: Option<String>,

    /// Mark the release as built from a dirty tree
    #[arg(long, conflicts_with = "scm_from")]
    pub scm_dirty: bool,

    /// Read commit hash and dirty state from the git repository at this path
    #[arg(long)]
    pub scm_from: Option<PathBuf>,

    /// Owner applied to the extracted release
    #[arg(long)]
    pub owner: Option<String>,

    /// Group applied to the extracted release
    #[arg(long)]
    pub group: Option<String>,
}
