//! Info Command - Show contract and runtime status

use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use votechain_client::networks::{network_label, NetworkEnv};

use super::connect::{load_config, ConnectArgs, VotingSession};

/// Show the resolved contract, its admin and the runtime status
#[derive(Args)]
pub struct InfoCommand {
    #[command(flatten)]
    connect: ConnectArgs,
}

impl InfoCommand {
    pub async fn execute(
        self,
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let config = load_config(&self.connect, config_path, data_dir)?;
        let session = VotingSession::open(&self.connect, config).await?;
        let account = session.connect().await?;

        let orchestrator = &session.orchestrator;
        let contract = orchestrator.contract_info();
        let chain_id = session.chain_id();

        println!("Contract:     {}", contract.kind.contract_name());
        println!("Address:      {}", contract.address_badge());
        println!("Network:      {} ({})", network_label(chain_id), chain_id);
        println!("Account:      {}", account);
        println!(
            "WalletConnect: {}",
            NetworkEnv::from_env().walletconnect_project_id()
        );

        if let (Some(address), Some(reader)) = (contract.address, session.reader()) {
            match reader.admin(address).await {
                Ok(admin) => println!("Admin:        {}", admin),
                Err(e) => warn!("Failed to read admin: {}", e),
            }
            match reader.total_players(address).await {
                Ok(total) => println!("Players:      {}", total),
                Err(e) => warn!("Failed to read player count: {}", e),
            }
        }

        if contract.kind.is_encrypted() {
            print!("Runtime:      {:?}", orchestrator.runtime().status());
            match orchestrator.runtime().error() {
                Some(err) => println!(" ({})", err),
                None => println!(),
            }
        }

        Ok(())
    }
}
