use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tiklink",
    version,
    about = "Resolve shared TikTok links into downloadable media descriptors"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Resolve one link (or text containing one) and print the JSON envelope
    Resolve {
        text: String,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also print the per-attempt summary to stderr
        #[arg(long, default_value_t = false)]
        trace: bool,
    },
}
