//! Votechain CLI
//!
//! Command-line front end for the player voting contracts.
//!
//! # Usage
//!
//! ```bash
//! # Scripted run against the in-process chain
//! votechain demo --contract encrypted
//!
//! # Write a configuration file for Sepolia
//! votechain init --network sepolia
//!
//! # List players on a local Hardhat node
//! votechain players --rpc-url http://127.0.0.1:8545
//!
//! # Rate player 0 with 7, then reveal the score
//! votechain vote 0 --rating 7
//! votechain decrypt 0
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use commands::{
    DecryptCommand, DemoCommand, InfoCommand, InitCommand, PlayersCommand, VoteCommand,
};
use config::VotechainConfig;

/// Player voting client
#[derive(Parser)]
#[command(name = "votechain")]
#[command(author = "Votechain Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rate players on-chain and reveal encrypted tallies", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, global = true, env = "VOTECHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file
    Init(InitCommand),

    /// Show contract and runtime status
    Info(InfoCommand),

    /// List players
    Players(PlayersCommand),

    /// Rate a player
    Vote(VoteCommand),

    /// Reveal a player's score
    Decrypt(DecryptCommand),

    /// Scripted run against the in-process chain
    Demo(DemoCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Flags win over the [logging] section
    let settings = cli
        .config
        .as_deref()
        .and_then(|path| VotechainConfig::load(path).ok())
        .map(|config| config.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(settings.level);
    logging::init(&level, cli.json_logs || settings.format == "json")?;

    match cli.command {
        Commands::Init(cmd) => cmd.execute(cli.data_dir).await,
        Commands::Info(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Players(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Vote(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Decrypt(cmd) => cmd.execute(cli.config, cli.data_dir).await,
        Commands::Demo(cmd) => cmd.execute().await,
        Commands::Version => {
            println!("votechain {}", env!("CARGO_PKG_VERSION"));
            println!("Contracts: SimpleVoting, EncryptedMvpVoting");
            Ok(())
        }
    }
}
