use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pm2en")]
#[command(about = "Copy PubMed records to the clipboard through the EndNote helper")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of $PM2EN_CONFIG or ~/.pubmed2endnote/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the record shown on a PubMed page (URL or bare PMID)
    Export {
        page: String,

        /// Only print the final notification
        #[arg(short, long)]
        quiet: bool,
    },
    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Check whether the helper process can be found
    Check,
    /// Answer one JSON background request read from stdin
    Request,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Store the contact email sent with PubMed requests
    SetEmail { email: String },
    /// Prompt for the contact email
    Edit,
    /// Print the config file location
    Path,
}
