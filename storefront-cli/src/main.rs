//! Storefront CLI - browse and manage the storefront from your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config, products, shell};

/// Storefront - browse and manage the store from your terminal
#[derive(Parser)]
#[command(name = "storefront", version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only products in this category
        #[arg(long, conflicts_with = "featured")]
        category: Option<String>,
        /// Only featured products
        #[arg(long)]
        featured: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Save a new API base URL to settings.json
        #[arg(long)]
        set_api_url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session: sign up, log in, manage products
    Shell,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` applies unless `--verbose` is given
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Products { category, featured, json } => products::run(category, featured, json).await,
        Commands::Config { set_api_url, json } => config::run(set_api_url, json),
        Commands::Shell => shell::run().await,
    }
}
