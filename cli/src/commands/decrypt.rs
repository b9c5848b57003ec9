//! Decrypt Command - Reveal a player's score

use std::path::PathBuf;

use clap::Args;

use votechain_client::orchestrator::VotingOrchestrator;
use votechain_client::progress::{progress_channel, DecryptProgress};

use super::connect::{load_config, ConnectArgs, VotingSession};

/// Grant decrypt access and reveal a player's score
#[derive(Args)]
pub struct DecryptCommand {
    /// Player id
    player: u32,

    #[command(flatten)]
    connect: ConnectArgs,
}

impl DecryptCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let config = load_config(&self.connect, config_path, data_dir)?;
        let session = VotingSession::open(&self.connect, config).await?;
        session.connect().await?;

        reveal(&session.orchestrator, self.player).await
    }
}

/// Run the decrypt flow, echoing each progress step
pub async fn reveal(orchestrator: &VotingOrchestrator, player_id: u32) -> anyhow::Result<()> {
    let (tx, mut rx) = progress_channel();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while let Some(event) = rx.recv().await {
            println!("  · {}", event);
            last = Some(event);
        }
        last
    });

    orchestrator.decrypt_locally(player_id, Some(tx)).await;

    match printer.await? {
        Some(DecryptProgress::Completed { clear }) => {
            println!();
            println!("Player {} score: {}", player_id, clear);
            Ok(())
        }
        Some(DecryptProgress::Cancelled) => {
            println!("Decryption cancelled.");
            Ok(())
        }
        other => anyhow::bail!("Decryption did not complete ({:?})", other),
    }
}
