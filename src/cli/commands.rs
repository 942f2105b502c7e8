//! CLI command definitions

use crate::execution::FailurePolicy;
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Analyze a message
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// File containing the message (reads stdin when omitted or `-`)
    pub file: Option<PathBuf>,

    /// API key (overrides the stored key)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model id (overrides the stored model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Behavior when a step fails
    #[arg(long, value_enum, default_value_t = FailurePolicyArg::Continue)]
    pub on_error: FailurePolicyArg,

    /// Chat-completion endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Timeout for each model call, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Use the default steps, ignoring customizations
    #[arg(long)]
    pub default_steps: bool,

    /// Don't save the analysis to history
    #[arg(long)]
    pub no_history: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Failure policy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FailurePolicyArg {
    /// Record an error for the step and keep going
    Continue,
    /// Stop at the first failed step
    Stop,
}

impl From<FailurePolicyArg> for FailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::Continue => FailurePolicy::ContinueOnError,
            FailurePolicyArg::Stop => FailurePolicy::FailFast,
        }
    }
}

/// Manage analysis steps
#[derive(Debug, Subcommand, Clone)]
pub enum StepsCommand {
    /// List steps in execution order
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a step's prompt and instructions
    Show { id: String },

    /// Create a new custom step
    Create,

    /// Copy a step
    #[command(name = "clone")]
    Duplicate { id: String },

    /// Delete a step
    Delete { id: String },

    /// Edit a step
    Edit(EditStepArgs),

    /// Restore a configured step from its template file
    Reset { id: String },

    /// Move a step to a new position (0-based)
    Move { id: String, position: usize },

    /// Discard every step customization
    RestoreDefaults,

    /// Replace the step configuration from a JSON or YAML file
    Import { file: PathBuf },
}

/// Fields of a step edit; omitted fields keep their current value
#[derive(Debug, Args, Clone)]
pub struct EditStepArgs {
    /// Step to edit
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Prompt text
    #[arg(long, conflicts_with = "prompt_file")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Model instructions
    #[arg(long, conflicts_with = "instructions_file")]
    pub instructions: Option<String>,

    /// Read the instructions from a file
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,

    /// New id (custom steps only)
    #[arg(long)]
    pub new_id: Option<String>,
}

/// Browse analysis history
#[derive(Debug, Subcommand, Clone)]
pub enum HistoryCommand {
    /// List saved analyses, newest first
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one saved analysis (0 is the newest)
    Show { index: usize },

    /// Delete all saved analyses
    Clear,
}

/// API and model settings
#[derive(Debug, Subcommand, Clone)]
pub enum ConfigCommand {
    /// Show the current settings
    Show,

    /// Store the API key
    SetKey { key: String },

    /// Select the model
    SetModel { model: String },

    /// List available models
    Models,

    /// Replace the models list from a JSON file
    ImportModels { file: PathBuf },

    /// Go back to the default models list
    ResetModels,
}
