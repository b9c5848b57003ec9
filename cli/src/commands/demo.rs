//! Demo Command - Scripted run against the in-process chain

use clap::Args;
use tracing::info;

use votechain_client::contract::ContractKind;
use votechain_client::local::DEV_ACCOUNTS;

use super::connect::{ConnectArgs, VotingSession};
use super::decrypt::reveal;
use super::players::print_roster;
use crate::config::VotechainConfig;

/// Two voters rate a player, then the last one reveals the total
#[derive(Args)]
pub struct DemoCommand {
    /// Contract flavour (simple, encrypted)
    #[arg(long, default_value = "encrypted")]
    contract: ContractKind,

    /// Player to rate
    #[arg(long, default_value = "0")]
    player: u32,

    /// Ratings, one per voter account
    #[arg(long, value_delimiter = ',', default_value = "7,4")]
    ratings: Vec<u8>,
}

impl DemoCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        let voters = &DEV_ACCOUNTS[1..];
        if self.ratings.len() > voters.len() {
            anyhow::bail!("At most {} ratings are supported", voters.len());
        }

        let args = ConnectArgs {
            local: true,
            contract: Some(self.contract),
            ..Default::default()
        };
        let mut config = VotechainConfig::local();
        config.contract.kind = self.contract;
        config.voting.fetch_delay_ms = 200;
        config.voting.status_linger_ms = 0;
        let session = VotingSession::open(&args, config).await?;

        println!("🗳  {} demo", self.contract.contract_name());
        println!();

        let mut last_voter = None;
        for (voter, rating) in voters.iter().zip(&self.ratings) {
            session.connect_as(*voter).await?;
            info!("Voter {} rates player {} with {}", voter, self.player, rating);
            println!("{} rates player {} with {}", voter, self.player, rating);
            if !session
                .orchestrator
                .vote_for_player(self.player, Some(*rating))
                .await
            {
                anyhow::bail!("Vote from {} was not recorded", voter);
            }
            last_voter = Some(*voter);
        }

        println!();
        print_roster(&session.orchestrator.players());

        if let Some(voter) = last_voter {
            println!();
            println!("{} reveals player {}", voter, self.player);
            reveal(&session.orchestrator, self.player).await?;
            println!();
            print_roster(&session.orchestrator.players());
        }

        Ok(())
    }
}
