//! Players Command - List the roster

use std::path::PathBuf;

use clap::Args;

use votechain_client::roster::PlayerSnapshot;

use super::connect::{load_config, ConnectArgs, VotingSession};

/// List players with their ballots and score handles
#[derive(Args)]
pub struct PlayersCommand {
    #[command(flatten)]
    connect: ConnectArgs,
}

impl PlayersCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let config = load_config(&self.connect, config_path, data_dir)?;
        let session = VotingSession::open(&self.connect, config).await?;
        session.connect().await?;

        print_roster(&session.orchestrator.players());
        Ok(())
    }
}

/// Render the roster as a table
pub fn print_roster(players: &[PlayerSnapshot]) {
    if players.is_empty() {
        println!("No players found.");
        return;
    }

    println!("{:<4} {:<22} {:>7} {:>8}  Handle", "ID", "Name", "Ballots", "Revealed");
    for player in players {
        let revealed = player
            .last_clear
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<22} {:>7} {:>8}  {}",
            player.id, player.name, player.ballots, revealed, player.handle
        );
    }
}
