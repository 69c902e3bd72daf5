use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tabnotes")]
#[command(version, about = "Debounced notes shared live between open pages")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub options: PageOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PageOptions {
    /// Storage origin directory shared by every page (default: ./.tabnotes)
    #[arg(long, global = true, value_name = "DIR")]
    pub origin: Option<PathBuf>,

    /// Quiet period before edits are saved, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub save_interval_ms: Option<u64>,

    /// How often to check for changes from other pages, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a writer page: add, edit and remove notes
    Write,

    /// Open a reader page that follows changes from writer pages
    Read,

    /// Print the stored notes in id order and exit
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
