use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audiograb")]
#[command(about = "Telegram bot that turns media links into audio files", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $AUDIOGRAB_CONFIG or config/audiograb.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Telegram bot
    Run,
    /// Download a single URL as audio and print the file path
    Fetch(FetchArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Media URL to download
    pub url: String,
}
