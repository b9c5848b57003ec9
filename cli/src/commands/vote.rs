//! Vote Command - Cast a ballot

use std::path::PathBuf;

use clap::Args;

use super::connect::{load_config, ConnectArgs, VotingSession};
use super::players::print_roster;

/// Rate a player
#[derive(Args)]
pub struct VoteCommand {
    /// Player id
    player: u32,

    /// Rating between 1 and 11; defaults to the configured rating
    #[arg(short, long)]
    rating: Option<u8>,

    #[command(flatten)]
    connect: ConnectArgs,
}

impl VoteCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let config = load_config(&self.connect, config_path, data_dir)?;
        let rating = self.rating.unwrap_or(config.voting.default_rating);
        let session = VotingSession::open(&self.connect, config).await?;
        let account = session.connect().await?;

        println!("Voting for player {} with rating {} as {}", self.player, rating, account);
        if !session
            .orchestrator
            .vote_for_player(self.player, Some(rating))
            .await
        {
            anyhow::bail!("Vote was not recorded");
        }

        println!();
        print_roster(&session.orchestrator.players());
        Ok(())
    }
}
