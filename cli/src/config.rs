//! Client Configuration
//!
//! Handles loading and saving client configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use votechain_client::contract::ContractKind;
use votechain_client::networks::{
    DEFAULT_SEPOLIA_RPC, LOCAL_CHAIN_ID, LOCAL_RPC_URL, SEPOLIA_CHAIN_ID,
};
use votechain_client::orchestrator::{OrchestratorBuilder, OrchestratorConfig, RATING_RANGE};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VotechainConfig {
    /// Node endpoint and chain
    #[serde(default)]
    pub network: NetworkSettings,

    /// Contract flavour and address overrides
    #[serde(default)]
    pub contract: ContractSettings,

    /// Voting behaviour
    #[serde(default)]
    pub voting: VotingSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl VotechainConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Create configuration for a specific network
    pub fn for_network(network: &str) -> Self {
        match network {
            "sepolia" => Self::sepolia(),
            _ => Self::local(),
        }
    }

    /// Local Hardhat node
    pub fn local() -> Self {
        Self::default()
    }

    /// Sepolia test network
    pub fn sepolia() -> Self {
        Self {
            network: NetworkSettings {
                name: "sepolia".to_string(),
                rpc_url: DEFAULT_SEPOLIA_RPC.to_string(),
                chain_id: SEPOLIA_CHAIN_ID,
                poll_interval_ms: 4_000,
                receipt_timeout_secs: 300,
                ..Default::default()
            },
            contract: ContractSettings {
                kind: ContractKind::Encrypted,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Orchestrator settings derived from `[voting]`
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorBuilder::new()
            .fetch_delay(Duration::from_millis(self.voting.fetch_delay_ms))
            .status_linger(Duration::from_millis(self.voting.status_linger_ms))
            .fallback_on_grant_failure(self.voting.fallback_on_grant_failure)
            .build()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.network.rpc_url.starts_with("http://")
            || self.network.rpc_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "RPC URL must be http(s): {}",
                self.network.rpc_url
            )));
        }

        if self.network.chain_id == 0 {
            return Err(ConfigError::Invalid(
                "Chain id must be greater than 0".to_string(),
            ));
        }

        if self.network.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if !RATING_RANGE.contains(&self.voting.default_rating) {
            return Err(ConfigError::Invalid(
                "Default rating must be between 1 and 11".to_string(),
            ));
        }

        Ok(())
    }
}

/// Network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Network name (local, sepolia)
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Chain the endpoint is expected to serve
    pub chain_id: u64,

    /// Receipt poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Receipt timeout in seconds
    pub receipt_timeout_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            rpc_url: LOCAL_RPC_URL.to_string(),
            chain_id: LOCAL_CHAIN_ID,
            poll_interval_ms: 500,
            receipt_timeout_secs: 120,
            request_timeout_secs: 30,
        }
    }
}

/// Contract settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSettings {
    /// Contract flavour (simple, encrypted)
    #[serde(default)]
    pub kind: ContractKind,

    /// Address override for the configured chain
    pub address: Option<Address>,

    /// Deployment table in the ABI generator's JSON layout
    pub address_book: Option<PathBuf>,
}

/// Voting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingSettings {
    /// Account to vote from; first node account when unset
    pub account: Option<Address>,

    /// Rating used when none is given
    pub default_rating: u8,

    /// Delay before the decrypt data read, in milliseconds
    pub fetch_delay_ms: u64,

    /// How long a success status stays visible, in milliseconds
    pub status_linger_ms: u64,

    /// Read the data anyway when the grant transaction fails
    pub fallback_on_grant_failure: bool,
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self {
            account: None,
            default_rating: 1,
            fetch_delay_ms: 1_000,
            status_linger_ms: 2_000,
            fallback_on_grant_failure: true,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default data directory
pub fn default_data_dir(network: &str) -> PathBuf {
    let base = directories::ProjectDirs::from("io", "votechain", "votechain")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".votechain"));

    base.join(network)
}

/// Get default config file path
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = VotechainConfig::default();
        assert_eq!(config.network.name, "local");
        assert_eq!(config.network.chain_id, LOCAL_CHAIN_ID);
        assert_eq!(config.contract.kind, ContractKind::Simple);
        assert_eq!(config.voting.default_rating, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sepolia_config() {
        let config = VotechainConfig::for_network("sepolia");
        assert_eq!(config.network.chain_id, SEPOLIA_CHAIN_ID);
        assert_eq!(config.contract.kind, ContractKind::Encrypted);
        assert!(config.network.rpc_url.starts_with("https://"));
    }

    #[test]
    fn test_save_load_config() {
        let dir = tempdir().unwrap();
        let path = default_config_path(&dir.path().join("local"));

        let mut config = VotechainConfig::local();
        config.contract.address = Some(Address::repeat_byte(0x42));
        config.voting.default_rating = 9;
        config.save(&path).unwrap();

        let loaded = VotechainConfig::load(&path).unwrap();
        assert_eq!(loaded.contract.address, Some(Address::repeat_byte(0x42)));
        assert_eq!(loaded.voting.default_rating, 9);
        assert_eq!(loaded.network.rpc_url, LOCAL_RPC_URL);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[contract]\nkind = \"encrypted\"\n").unwrap();

        let loaded = VotechainConfig::load(&path).unwrap();
        assert_eq!(loaded.contract.kind, ContractKind::Encrypted);
        assert_eq!(loaded.network.chain_id, LOCAL_CHAIN_ID);
        assert_eq!(loaded.voting.fetch_delay_ms, 1_000);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = VotechainConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_rating() {
        let config = VotechainConfig {
            voting: VotingSettings {
                default_rating: 12,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = VotechainConfig::local();
        config.network.rpc_url = "ws://127.0.0.1:8546".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_orchestrator_settings() {
        let mut config = VotechainConfig::local();
        config.voting.fetch_delay_ms = 0;
        config.voting.fallback_on_grant_failure = false;
        let orchestrator = config.orchestrator();
        assert_eq!(orchestrator.fetch_delay, Duration::ZERO);
        assert!(!orchestrator.decrypt_policy.fallback_on_grant_failure);
    }
}
