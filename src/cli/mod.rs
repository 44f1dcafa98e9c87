use clap::{Parser, Subcommand};

use crate::errors::CodecResult;

pub mod commands;

/// CoinSpark metadata inspector
#[derive(Parser)]
#[command(name = "coinspark")]
#[command(about = "Decode and encode CoinSpark OP_RETURN metadata and addresses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Decode every CoinSpark section carried by an OP_RETURN script
    DecodeScript(commands::decode::DecodeScriptCommand),
    /// Decode a CoinSpark address string
    DecodeAddress(commands::decode::DecodeAddressCommand),
    /// Wrap a Bitcoin address into a CoinSpark address
    EncodeAddress(commands::encode::EncodeAddressCommand),
}

pub fn run() -> CodecResult<()> {
    // Initialise tracing subscriber to capture debug!() macros
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DecodeScript(command) => command.run(),
        Commands::DecodeAddress(command) => command.run(),
        Commands::EncodeAddress(command) => command.run(),
    }
}
