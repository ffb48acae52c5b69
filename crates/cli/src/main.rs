//! Namespace scheduler CLI
//!
//! Shuts down, starts up and inspects namespaces through the ns-scheduler
//! daemon API.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{scale, state};

/// Namespace scheduler CLI
#[derive(Parser, Debug)]
#[command(name = "nss")]
#[command(author, version, about = "CLI for the namespace scheduler", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via NSS_API_URL env var)
    #[arg(long, env = "NSS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the workloads of matching namespaces
    Up {
        /// Namespace patterns (full-match regular expressions)
        #[arg(required = true)]
        namespaces: Vec<String>,

        /// Workloads started before each pause (0 disables batching)
        #[arg(long)]
        batch_size: Option<u32>,

        /// Seconds to pause between batches
        #[arg(long = "batch-interval")]
        batch_interval: Option<u64>,
    },

    /// Scale every workload of matching namespaces to zero
    Down {
        /// Namespace patterns (full-match regular expressions)
        #[arg(required = true)]
        namespaces: Vec<String>,
    },

    /// Show pods and requested resources of matching namespaces
    State {
        /// Namespace patterns (full-match regular expressions)
        #[arg(required = true)]
        namespaces: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Up {
            namespaces,
            batch_size,
            batch_interval,
        } => {
            scale::up(&client, namespaces, batch_size, batch_interval, cli.format).await?;
        }
        Commands::Down { namespaces } => {
            scale::down(&client, namespaces, cli.format).await?;
        }
        Commands::State { namespaces } => {
            state::show_state(&client, namespaces, cli.format).await?;
        }
    }

    Ok(())
}
