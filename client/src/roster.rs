//! Player roster snapshots

use crate::chain::PlayerTable;
use crate::contract::ContractKind;
use alloy_primitives::{hex, Address, U256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One player as last read from the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: u32,
    pub name: String,
    pub ballots: u64,
    /// Ciphertext handle or `score_<n>` tag
    pub handle: String,
    pub last_clear: Option<u64>,
    /// Unix seconds of the last reveal
    pub last_updated: Option<u64>,
    pub last_requester: Option<Address>,
}

impl PlayerSnapshot {
    /// Record a revealed score
    pub fn reveal(&mut self, clear: u64, at: u64) {
        self.last_clear = Some(clear);
        self.last_updated = Some(at);
    }
}

/// Display form of a score word
pub fn render_handle(kind: ContractKind, score: U256) -> String {
    match kind {
        ContractKind::Simple => format!("score_{score}"),
        ContractKind::Encrypted => hex::encode_prefixed(score.to_be_bytes::<32>()),
    }
}

/// Build a fresh roster from `listPlayers()` output
///
/// Names drive the length; missing scores or ballots read as zero.
pub fn snapshots_from_table(kind: ContractKind, table: &PlayerTable) -> Vec<PlayerSnapshot> {
    table
        .names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let score = table.scores.get(index).copied().unwrap_or(U256::ZERO);
            let ballots = table.ballots.get(index).copied().unwrap_or(0);
            let last_clear = match kind {
                ContractKind::Simple => Some(u64::try_from(score).unwrap_or(u64::MAX)),
                ContractKind::Encrypted => None,
            };
            PlayerSnapshot {
                id: index as u32,
                name: name.clone(),
                ballots,
                handle: render_handle(kind, score),
                last_clear,
                last_updated: None,
                last_requester: None,
            }
        })
        .collect()
}

/// Current Unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
