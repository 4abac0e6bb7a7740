mod api;
mod cli;
mod models;
mod services;
mod store;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::services::trainer::DEFAULT_TEST_SIZE;

#[derive(Parser)]
#[command(name = "fairline")]
#[command(about = "A de-vigged pricing oracle for two-outcome sports wagers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature table from a raw match CSV
    Prepare {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Train the pricing model and persist its artifacts
    Train {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
        #[arg(short, long, default_value_t = DEFAULT_TEST_SIZE)]
        test_size: usize,
    },
    /// Start the pricing API server
    Serve {
        #[arg(short, long, default_value = "8000")]
        port: u16,
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
    /// Generate a synthetic raw match CSV
    Sample {
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, default_value = "2000")]
        matches: usize,
        #[arg(short, long, default_value = "20")]
        teams: usize,
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Prepare { input, output }) => {
            let input = input.unwrap_or_else(store::default_matches_path);
            let output = output.unwrap_or_else(store::default_features_path);
            cli::prepare_features(&input, &output)?;
        }
        Some(Commands::Train {
            input,
            model_dir,
            test_size,
        }) => {
            let input = input.unwrap_or_else(store::default_features_path);
            let model_dir = model_dir.unwrap_or_else(store::default_model_dir);
            cli::train_model(&input, &model_dir, test_size)?;
        }
        Some(Commands::Serve { port, model_dir }) => {
            let model_dir = model_dir.unwrap_or_else(store::default_model_dir);
            tracing::info!("Starting fairline pricing service on port {}", port);
            api::serve(port, &model_dir).await?;
        }
        Some(Commands::Sample {
            output,
            matches,
            teams,
            seed,
        }) => {
            let output = output.unwrap_or_else(store::default_matches_path);
            cli::generate_sample(&output, matches, teams, seed)?;
        }
        None => {
            // Default to serving
            let model_dir = store::default_model_dir();
            tracing::info!("Starting fairline pricing service on port 8000");
            api::serve(8000, &model_dir).await?;
        }
    }

    Ok(())
}
