use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "rms-scaffold",
    version,
    about = "Materialize the Research Management System workspace skeleton"
)]
pub struct Cli {
    /// Change to this directory before doing anything else.
    #[arg(short = 'C', long = "chdir")]
    pub chdir: Option<PathBuf>,
    /// Layout file to use instead of the discovered or built-in one.
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,
    /// Root directory the layout is materialized under (defaults to the current directory).
    #[arg(long = "root", global = true)]
    pub root: Option<PathBuf>,
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create every directory and placeholder file in the layout (the default).
    Create,
    /// Report layout entries missing from the target root.
    Check,
    /// Print the directory tree beneath the target root.
    Tree(TreeArgs),
    /// Layout display, generation, and editing.
    Layout {
        #[command(subcommand)]
        command: Option<LayoutCommand>,
    },
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Maximum directory depth to descend.
    #[arg(long = "depth", default_value_t = 12)]
    pub depth: usize,
    /// Include hidden files and build artifacts.
    #[arg(long = "all", default_value_t = false)]
    pub all: bool,
}

#[derive(Subcommand, Debug)]
pub enum LayoutCommand {
    Show,
    Path,
    Generate {
        #[arg()]
        path: Option<PathBuf>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
    },
    Add {
        /// Group directory path, relative to the root.
        dir: String,
        /// Filenames to place under the group directory.
        files: Vec<String>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
        #[arg(long = "append", default_value_t = false)]
        append: bool,
    },
}

/// Helper entry point so `main` can stay minimal.
pub fn parse() -> Cli {
    Cli::parse()
}
