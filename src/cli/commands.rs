use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::BrainKind;

/// `poietic-agent` - an autonomous drawing agent for the Poietic canvas.
#[derive(Parser, Debug)]
#[command(name = "poietic-agent")]
#[command(version)]
#[command(about = "An autonomous drawing agent for a shared canvas.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.poietic-agent/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the agent (seed, then act on every new snapshot)
    Run {
        /// Fallback identity until the canvas assigns one
        #[arg(long)]
        agent_id: Option<String>,

        /// Brain to use (pattern, http)
        #[arg(long)]
        brain: Option<BrainKind>,

        /// Run the seed and the first action, then stop
        #[arg(long)]
        once: bool,
    },

    /// Show the last status written by a running agent
    Status,

    /// Print the effective configuration as TOML
    Config,
}
