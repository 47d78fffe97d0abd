//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cascade - rate-limit-aware routing across generation API tiers
#[derive(Parser, Debug)]
#[command(name = "cascade")]
#[command(about = "Rate-limit-aware routing across generation API tiers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ~/.config/cascade/cascade.toml and ./cascade.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a prompt through the tier cascade
    Request {
        /// Prompt text
        prompt: String,

        /// Preferred tier id
        #[arg(long)]
        tier: Option<String>,

        /// Bypass the response cache for this request
        #[arg(long)]
        skip_cache: bool,

        /// Feature label for usage records
        #[arg(long)]
        feature: Option<String>,

        /// Extract and pretty-print the JSON value in the response
        #[arg(long)]
        json: bool,
    },

    /// Show tier budgets and exhaustion status
    Tiers,

    /// Clear the exhaustion registry
    Reset,
}
