//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ConfigCommand, HistoryCommand, RunCommand, StepsCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Multi-step LLM analysis of email messages
#[derive(Debug, Parser, Clone)]
#[command(name = "mailsteps")]
#[command(version = "0.1.0")]
#[command(about = "Analyze an email through a configurable chain of LLM prompts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the settings database
    #[arg(long, global = true, env = "MAILSTEPS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory containing `config/` and `prompts/`
    #[arg(long, global = true, default_value = ".")]
    pub assets_dir: PathBuf,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Analyze a message
    Run(RunCommand),

    /// Manage analysis steps
    #[command(subcommand)]
    Steps(StepsCommand),

    /// Browse analysis history
    #[command(subcommand)]
    History(HistoryCommand),

    /// API and model settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
