//! Network Definitions
//!
//! Built-in chain definitions and the environment options that tune them.
//! Every option falls back to a built-in default when absent.

use alloy_primitives::Address;
use std::collections::HashMap;
use tracing::warn;

/// Chain id of the local development chain
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Chain id of the Sepolia public test network
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Fixed RPC endpoint of the local development chain
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Public Sepolia endpoint used when no custom RPC is configured
pub const DEFAULT_SEPOLIA_RPC: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// WalletConnect project id used when none is configured
pub const DEFAULT_WALLETCONNECT_ID: &str = "votechain-local-demo";

/// Prefix of the per-chain contract address override variables
pub const ENV_CONTRACT_ADDRESS_PREFIX: &str = "VOTECHAIN_CONTRACT_ADDRESS_";

/// WalletConnect project id variable
pub const ENV_WALLETCONNECT_ID: &str = "VOTECHAIN_WALLETCONNECT_ID";

/// Custom Sepolia RPC variable
pub const ENV_SEPOLIA_RPC: &str = "VOTECHAIN_SEPOLIA_RPC";

/// Deployment-table name of a chain
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        LOCAL_CHAIN_ID => "hardhat",
        SEPOLIA_CHAIN_ID => "sepolia",
        _ => "unknown",
    }
}

/// Human label used in wallet-facing messages
pub fn network_label(chain_id: u64) -> &'static str {
    match chain_id {
        LOCAL_CHAIN_ID => "localhost",
        SEPOLIA_CHAIN_ID => "Sepolia",
        _ => "unknown",
    }
}

/// Name of the override variable for a chain
pub fn contract_address_env_key(chain_id: u64) -> String {
    match chain_id {
        LOCAL_CHAIN_ID => format!("{ENV_CONTRACT_ADDRESS_PREFIX}LOCALHOST"),
        SEPOLIA_CHAIN_ID => format!("{ENV_CONTRACT_ADDRESS_PREFIX}SEPOLIA"),
        other => format!("{ENV_CONTRACT_ADDRESS_PREFIX}{other}"),
    }
}

/// A chain the client knows how to reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDefinition {
    pub id: u64,
    pub name: &'static str,
    pub rpc_url: String,
    pub testnet: bool,
}

impl ChainDefinition {
    /// Local development chain
    pub fn local() -> Self {
        Self {
            id: LOCAL_CHAIN_ID,
            name: "FHE Hardhat",
            rpc_url: LOCAL_RPC_URL.to_string(),
            testnet: true,
        }
    }

    /// Sepolia test network
    pub fn sepolia(rpc_url: impl Into<String>) -> Self {
        Self {
            id: SEPOLIA_CHAIN_ID,
            name: "Sepolia",
            rpc_url: rpc_url.into(),
            testnet: true,
        }
    }
}

/// Environment-driven network options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkEnv {
    /// Per-chain contract address overrides
    pub contract_addresses: HashMap<u64, Address>,
    /// WalletConnect project id
    pub walletconnect_project_id: Option<String>,
    /// Custom Sepolia RPC endpoint
    pub sepolia_rpc: Option<String>,
}

impl NetworkEnv {
    /// Read the options from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Read the options from an arbitrary variable list
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            if value.is_empty() {
                continue;
            }

            if key == ENV_WALLETCONNECT_ID {
                env.walletconnect_project_id = Some(value.to_string());
            } else if key == ENV_SEPOLIA_RPC {
                env.sepolia_rpc = Some(value.to_string());
            } else if let Some(suffix) = key.strip_prefix(ENV_CONTRACT_ADDRESS_PREFIX) {
                let chain_id = match suffix {
                    "LOCALHOST" => Some(LOCAL_CHAIN_ID),
                    "SEPOLIA" => Some(SEPOLIA_CHAIN_ID),
                    other => other.parse::<u64>().ok(),
                };

                match (chain_id, value.parse::<Address>()) {
                    (Some(chain_id), Ok(address)) => {
                        env.contract_addresses.insert(chain_id, address);
                    }
                    _ => warn!("Ignoring invalid contract override {}={}", key, value),
                }
            }
        }

        env
    }

    /// Configured WalletConnect project id or the built-in default
    pub fn walletconnect_project_id(&self) -> &str {
        self.walletconnect_project_id
            .as_deref()
            .unwrap_or(DEFAULT_WALLETCONNECT_ID)
    }

    /// Configured Sepolia endpoint or the public default
    pub fn sepolia_rpc(&self) -> &str {
        self.sepolia_rpc.as_deref().unwrap_or(DEFAULT_SEPOLIA_RPC)
    }

    /// All supported chains
    pub fn chains(&self) -> Vec<ChainDefinition> {
        vec![
            ChainDefinition::local(),
            ChainDefinition::sepolia(self.sepolia_rpc()),
        ]
    }

    /// Definition of one supported chain
    pub fn chain(&self, chain_id: u64) -> Option<ChainDefinition> {
        self.chains().into_iter().find(|c| c.id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let env = NetworkEnv::from_vars(Vec::<(String, String)>::new());
        assert_eq!(env.walletconnect_project_id(), DEFAULT_WALLETCONNECT_ID);
        assert_eq!(env.sepolia_rpc(), DEFAULT_SEPOLIA_RPC);
        assert!(env.contract_addresses.is_empty());
        assert_eq!(env.chain(LOCAL_CHAIN_ID).map(|c| c.rpc_url), Some(LOCAL_RPC_URL.into()));
    }

    #[test]
    fn test_contract_overrides() {
        let env = NetworkEnv::from_vars([
            (
                "VOTECHAIN_CONTRACT_ADDRESS_LOCALHOST",
                "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            ),
            (
                "VOTECHAIN_CONTRACT_ADDRESS_8453",
                "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0",
            ),
            ("VOTECHAIN_CONTRACT_ADDRESS_SEPOLIA", "not-an-address"),
            ("VOTECHAIN_SEPOLIA_RPC", "https://rpc.example"),
            ("UNRELATED", "x"),
        ]);

        assert_eq!(env.contract_addresses.len(), 2);
        assert!(env.contract_addresses.contains_key(&LOCAL_CHAIN_ID));
        assert!(env.contract_addresses.contains_key(&8453));
        assert_eq!(env.sepolia_rpc(), "https://rpc.example");
        assert_eq!(
            env.chain(SEPOLIA_CHAIN_ID).map(|c| c.rpc_url),
            Some("https://rpc.example".into())
        );
    }

    #[test]
    fn test_names_and_keys() {
        assert_eq!(chain_name(LOCAL_CHAIN_ID), "hardhat");
        assert_eq!(network_label(SEPOLIA_CHAIN_ID), "Sepolia");
        assert_eq!(network_label(1), "unknown");
        assert_eq!(
            contract_address_env_key(SEPOLIA_CHAIN_ID),
            "VOTECHAIN_CONTRACT_ADDRESS_SEPOLIA"
        );
        assert_eq!(contract_address_env_key(10), "VOTECHAIN_CONTRACT_ADDRESS_10");
    }
}
