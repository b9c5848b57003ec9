//! Contract Info Resolution
//!
//! Derives {ABI, address, chain} for the connected chain. Lookup order:
//! 1. per-chain override (environment or configuration)
//! 2. static deployment table
//!
//! A missing or zero address is a valid outcome: it means "not deployed on
//! this chain" and disables every action that needs the contract.

use crate::networks::{chain_name, NetworkEnv, LOCAL_CHAIN_ID, SEPOLIA_CHAIN_ID};
use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Which voting contract the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Clear-text scores, `voteFor(uint256,uint8)`
    #[default]
    Simple,
    /// Encrypted scores, `voteFor(uint256,bytes32,bytes)`
    Encrypted,
}

impl ContractKind {
    pub fn contract_name(&self) -> &'static str {
        match self {
            ContractKind::Simple => "SimpleVoting",
            ContractKind::Encrypted => "EncryptedMvpVoting",
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, ContractKind::Encrypted)
    }

    pub fn abi(&self) -> ContractAbi {
        match self {
            ContractKind::Simple => ContractAbi {
                contract_name: "SimpleVoting",
                functions: SIMPLE_VOTING_FUNCTIONS,
            },
            ContractKind::Encrypted => ContractAbi {
                contract_name: "EncryptedMvpVoting",
                functions: ENCRYPTED_VOTING_FUNCTIONS,
            },
        }
    }
}

impl std::str::FromStr for ContractKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(ContractKind::Simple),
            "encrypted" => Ok(ContractKind::Encrypted),
            other => Err(format!("unknown contract kind: {other}")),
        }
    }
}

const SIMPLE_VOTING_FUNCTIONS: &[&str] = &[
    "function admin() view returns (address)",
    "function totalPlayers() view returns (uint256)",
    "function listPlayers() view returns (string[] names, uint256[] scores, uint256[] ballots)",
    "function getPlayer(uint256 playerId) view returns (string name, uint256 score, uint256 ballots)",
    "function voteFor(uint256 playerId, uint8 rating)",
    "function allowAdminToDecrypt(uint256 playerId)",
];

const ENCRYPTED_VOTING_FUNCTIONS: &[&str] = &[
    "function admin() view returns (address)",
    "function totalPlayers() view returns (uint256)",
    "function listPlayers() view returns (string[] names, bytes32[] scores, uint256[] ballots)",
    "function getPlayer(uint256 playerId) view returns (string name, bytes32 score, uint256 ballots)",
    "function voteFor(uint256 playerId, bytes32 encryptedRating, bytes inputProof)",
    "function allowAdminToDecrypt(uint256 playerId)",
];

/// Human-readable ABI of one contract flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAbi {
    pub contract_name: &'static str,
    pub functions: &'static [&'static str],
}

impl ContractAbi {
    /// Whether the ABI declares a function with this name
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|sig| {
            sig.strip_prefix("function ")
                .and_then(|rest| rest.split('(').next())
                .map(|n| n == name)
                .unwrap_or(false)
        })
    }
}

/// One row of the deployment table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    pub chain_id: u64,
    pub chain_name: String,
}

/// Address book errors
#[derive(Debug, Error)]
pub enum AddressBookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static deployment table keyed by chain id string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    entries: BTreeMap<String, Deployment>,
}

impl AddressBook {
    /// Deployments shipped with the client
    pub fn builtin(kind: ContractKind) -> Self {
        let mut book = Self::default();
        match kind {
            ContractKind::Simple => {
                book.insert(Deployment {
                    address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
                    chain_id: LOCAL_CHAIN_ID,
                    chain_name: chain_name(LOCAL_CHAIN_ID).to_string(),
                });
                book.insert(Deployment {
                    address: Address::ZERO,
                    chain_id: SEPOLIA_CHAIN_ID,
                    chain_name: chain_name(SEPOLIA_CHAIN_ID).to_string(),
                });
            }
            ContractKind::Encrypted => {
                book.insert(Deployment {
                    address: address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
                    chain_id: LOCAL_CHAIN_ID,
                    chain_name: chain_name(LOCAL_CHAIN_ID).to_string(),
                });
                book.insert(Deployment {
                    address: address!("F51dA7a6fa07913DfDc9345aC04fC837Bdf23aF6"),
                    chain_id: SEPOLIA_CHAIN_ID,
                    chain_name: chain_name(SEPOLIA_CHAIN_ID).to_string(),
                });
            }
        }
        book
    }

    /// Parse the JSON layout written by the ABI generator
    pub fn from_json(json: &str) -> Result<Self, AddressBookError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a generated address file
    pub fn load(path: &Path) -> Result<Self, AddressBookError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, AddressBookError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Insert or replace the row for a deployment's chain
    pub fn insert(&mut self, deployment: Deployment) {
        self.entries
            .insert(deployment.chain_id.to_string(), deployment);
    }

    pub fn get(&self, chain_id: u64) -> Option<&Deployment> {
        self.entries.get(&chain_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Contract coordinates for the active chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    pub kind: ContractKind,
    pub abi: ContractAbi,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub chain_name: Option<String>,
}

impl ContractInfo {
    fn abi_only(kind: ContractKind) -> Self {
        Self {
            kind,
            abi: kind.abi(),
            address: None,
            chain_id: None,
            chain_name: None,
        }
    }

    /// Whether actions against the contract are possible
    pub fn is_deployed(&self) -> bool {
        self.address.is_some()
    }

    /// Short badge such as `0x5FbD...0aa3`
    pub fn address_badge(&self) -> String {
        match self.address {
            Some(address) => {
                let full = address.to_checksum(None);
                format!("{}...{}", &full[..6], &full[full.len() - 4..])
            }
            None => "No deployment for this network".to_string(),
        }
    }
}

/// Resolves [`ContractInfo`] from the active chain id
#[derive(Debug, Clone)]
pub struct ContractResolver {
    kind: ContractKind,
    book: AddressBook,
    overrides: HashMap<u64, Address>,
}

impl ContractResolver {
    /// Resolver over the built-in deployment table
    pub fn new(kind: ContractKind) -> Self {
        Self {
            kind,
            book: AddressBook::builtin(kind),
            overrides: HashMap::new(),
        }
    }

    /// Resolver honouring the environment overrides
    pub fn from_env(kind: ContractKind, env: &NetworkEnv) -> Self {
        Self::new(kind).with_overrides(env.contract_addresses.clone())
    }

    pub fn with_address_book(mut self, book: AddressBook) -> Self {
        self.book = book;
        self
    }

    pub fn with_overrides(mut self, overrides: HashMap<u64, Address>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn with_override(mut self, chain_id: u64, address: Address) -> Self {
        self.overrides.insert(chain_id, address);
        self
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Resolve the contract for a chain; never fails
    pub fn resolve(&self, chain_id: Option<u64>) -> ContractInfo {
        let Some(chain_id) = chain_id else {
            return ContractInfo::abi_only(self.kind);
        };

        if let Some(address) = self.overrides.get(&chain_id).filter(|a| !a.is_zero()) {
            return ContractInfo {
                address: Some(*address),
                chain_id: Some(chain_id),
                chain_name: Some(chain_name(chain_id).to_string()),
                ..ContractInfo::abi_only(self.kind)
            };
        }

        match self.book.get(chain_id) {
            Some(entry) if !entry.address.is_zero() => ContractInfo {
                address: Some(entry.address),
                chain_id: Some(entry.chain_id),
                chain_name: Some(entry.chain_name.clone()),
                ..ContractInfo::abi_only(self.kind)
            },
            entry => ContractInfo {
                chain_id: Some(chain_id),
                chain_name: entry.map(|e| e.chain_name.clone()),
                ..ContractInfo::abi_only(self.kind)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_chain_returns_abi_only() {
        let info = ContractResolver::new(ContractKind::Simple).resolve(None);
        assert!(info.address.is_none());
        assert!(info.chain_id.is_none());
        assert!(info.abi.has_function("listPlayers"));
    }

    #[test]
    fn test_builtin_local_deployment() {
        let info = ContractResolver::new(ContractKind::Encrypted).resolve(Some(LOCAL_CHAIN_ID));
        assert_eq!(
            info.address,
            Some(address!("9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"))
        );
        assert_eq!(info.chain_name.as_deref(), Some("hardhat"));
        assert_eq!(info.address_badge(), "0x9fE4...a6e0");
    }

    #[test]
    fn test_zero_address_means_not_deployed() {
        let info = ContractResolver::new(ContractKind::Simple).resolve(Some(SEPOLIA_CHAIN_ID));
        assert!(!info.is_deployed());
        assert_eq!(info.chain_id, Some(SEPOLIA_CHAIN_ID));
        assert_eq!(info.chain_name.as_deref(), Some("sepolia"));
        assert_eq!(info.address_badge(), "No deployment for this network");
    }

    #[test]
    fn test_override_wins_and_zero_override_ignored() {
        let custom = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let resolver = ContractResolver::new(ContractKind::Simple)
            .with_override(LOCAL_CHAIN_ID, custom)
            .with_override(SEPOLIA_CHAIN_ID, Address::ZERO);

        assert_eq!(resolver.resolve(Some(LOCAL_CHAIN_ID)).address, Some(custom));
        assert!(resolver.resolve(Some(SEPOLIA_CHAIN_ID)).address.is_none());
    }

    #[test]
    fn test_override_on_unknown_chain() {
        let custom = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
        let info = ContractResolver::new(ContractKind::Simple)
            .with_override(8453, custom)
            .resolve(Some(8453));
        assert_eq!(info.address, Some(custom));
        assert_eq!(info.chain_name.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_address_book_json_roundtrip_via_file() {
        let book = AddressBook::builtin(ContractKind::Encrypted);
        let dir = tempdir().unwrap();
        let path = dir.path().join("EncryptedMvpVotingAddresses.json");
        std::fs::write(&path, book.to_json().unwrap()).unwrap();

        let loaded = AddressBook::load(&path).unwrap();
        assert_eq!(loaded, book);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_generated_layout_parses() {
        let json = r#"{
            "31337": {
                "address": "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9",
                "chainId": 31337,
                "chainName": "hardhat"
            }
        }"#;
        let book = AddressBook::from_json(json).unwrap();
        let info = ContractResolver::new(ContractKind::Encrypted)
            .with_address_book(book)
            .resolve(Some(LOCAL_CHAIN_ID));
        assert_eq!(
            info.address,
            Some(address!("Cf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"))
        );
    }

    proptest! {
        #[test]
        fn prop_unknown_chains_have_no_address(chain_id in any::<u64>()) {
            prop_assume!(chain_id != LOCAL_CHAIN_ID && chain_id != SEPOLIA_CHAIN_ID);
            for kind in [ContractKind::Simple, ContractKind::Encrypted] {
                let info = ContractResolver::new(kind).resolve(Some(chain_id));
                prop_assert!(info.address.is_none());
                prop_assert_eq!(info.chain_id, Some(chain_id));
            }
        }
    }
}
