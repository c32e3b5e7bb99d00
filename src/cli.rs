use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "tubefeed",
    version,
    about = "Resolve channel references and merge recent uploads"
)]
pub struct Cli {
    /// Config file; defaults to tubefeed.yaml in the working directory.
    #[arg(long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a channel reference (id, URL, or @handle) to its canonical id
    Resolve { reference: String },
    /// Merged recent uploads across channels or a saved list
    Feed {
        /// Channel references; free-form text with several references works
        references: Vec<String>,
        /// Aggregate a saved list instead of explicit references
        #[arg(short, long, conflicts_with = "references")]
        list: Option<String>,
        /// Uploads per channel (capped at 50)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Emit the full aggregation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Metadata for a single known video id
    Video { video_id: String },
    /// Inspect or edit saved lists (seeded from config, process-lifetime)
    List {
        #[command(subcommand)]
        command: ListCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Print a list's channel ids
    Show { list_id: String },
    /// Resolve a reference and add it to a list
    Add { list_id: String, reference: String },
    /// Resolve a reference and remove it from a list
    Remove { list_id: String, reference: String },
    /// Replace a list's contents with the given references
    Replace {
        list_id: String,
        references: Vec<String>,
    },
}
