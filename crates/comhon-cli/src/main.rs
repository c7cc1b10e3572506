//! Comhon CLI
//!
//! Command-line interface for validating and converting documents against
//! Comhon manifests

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "comhon")]
#[command(about = "Comhon - Schema driven object modeling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a document against a model
    Validate(commands::validate::ValidateArgs),
    /// Convert a document between JSON and XML
    Convert(commands::convert::ConvertArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Convert(args) => commands::convert::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
