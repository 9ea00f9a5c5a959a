//! CLI interface for Axon
//!
//! Command-line surface built with clap's derive API. Every command runs
//! in-process against a fresh conversation store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::strategy::StrategyPreferences;

/// Axon AI tutor
///
/// Answers study questions with a chat model, optionally backed by web
/// search, a tool-using agent, uploaded notes and translation.
#[derive(Parser, Debug)]
#[command(name = "axon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask the tutor one question
    Ask(AskArgs),

    /// Interactive chat with the tool agent (type `exit` or `clear`)
    Chat,

    /// Translate text
    Translate {
        text: String,

        /// Source language code; detected when omitted
        #[arg(long)]
        from: Option<String>,

        /// Target language code
        #[arg(long)]
        to: String,
    },

    /// Transcribe an audio file
    Transcribe {
        file: PathBuf,

        #[arg(short, long, default_value = "en")]
        language: String,

        /// Local model size (tiny, base, small, medium, large)
        #[arg(long)]
        variant: Option<String>,

        /// Use the remote Groq Whisper service
        #[arg(long)]
        remote: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage API keys in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// Check configuration, keys and available strategies
    Doctor,
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The question
    pub question: String,

    /// Conversation id to use
    #[arg(long)]
    pub conversation: Option<String>,

    /// Language of the question ("auto" to detect)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Document to upload before asking (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Allow the graph reasoning agent
    #[arg(long)]
    pub graph: bool,

    /// Disallow direct premium search
    #[arg(long)]
    pub no_search: bool,

    /// Disallow the tool-using agent
    #[arg(long)]
    pub no_agent: bool,
}

impl AskArgs {
    pub fn preferences(&self) -> StrategyPreferences {
        StrategyPreferences {
            graph_agent: self.graph,
            direct_search: !self.no_search,
            tool_agent: !self.no_agent,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[derive(Subcommand, Debug)]
pub enum SecretAction {
    /// Store a key (prompts for the value)
    Set { key: String },

    /// Remove a key
    Delete { key: String },

    /// Show which known keys are configured
    List,
}
