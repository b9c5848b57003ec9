//! Init Command - Write a configuration file

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::{default_config_path, default_data_dir, VotechainConfig};

/// Write a configuration file for a network
#[derive(Args)]
pub struct InitCommand {
    /// Network to initialize for (local, sepolia)
    #[arg(short, long, default_value = "local")]
    network: String,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
        let data_dir = data_dir.unwrap_or_else(|| default_data_dir(&self.network));
        let config_path = default_config_path(&data_dir);

        info!("Initializing votechain for {} network", self.network);
        info!("Data directory: {}", data_dir.display());

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let config = VotechainConfig::for_network(&self.network);
        config.save(&config_path)?;

        info!("Configuration saved to {}", config_path.display());

        println!();
        println!("✅ votechain initialized");
        println!();
        println!("Configuration: {}", config_path.display());
        println!("Endpoint:      {}", config.network.rpc_url);
        println!("Contract:      {}", config.contract.kind.contract_name());
        println!();
        println!("To list players:");
        println!("  votechain players --data-dir {}", data_dir.display());

        Ok(())
    }
}
