//! RPC Request and Response Types

use alloy_primitives::{Address, Bytes, B256, U64};
use serde::{Deserialize, Serialize};

/// Default block tag for reads
pub const LATEST_BLOCK: &str = "latest";

/// `eth_call` / `eth_sendTransaction` request object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Sender; required for transactions, optional for calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Contract address
    pub to: Address,
    /// ABI-encoded calldata
    #[serde(rename = "data")]
    pub input: Bytes,
}

impl TransactionRequest {
    pub fn call(to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            input: input.into(),
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// `eth_getTransactionReceipt` response (the fields we read)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: B256,
    /// Block the transaction was mined in
    #[serde(default)]
    pub block_number: Option<U64>,
    /// 1 for success, 0 for a reverted transaction
    #[serde(default)]
    pub status: Option<U64>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts have no status; treat them as successful
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| status == U64::from(1))
    }

    pub fn block(&self) -> Option<u64> {
        self.block_number.and_then(|n| u64::try_from(n).ok())
    }
}
