//! Chain Interaction Seams
//!
//! Traits the orchestrator uses to reach the voting contract. Transports
//! (JSON-RPC, the in-memory local chain) implement them and classify their
//! own failures into [`ErrorKind`](crate::errors::ErrorKind).

use crate::errors::{ChainError, ChainResult};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::Value;

/// Transaction hash
pub type TxHash = B256;

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Parallel arrays returned by `listPlayers()`, aligned by index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerTable {
    pub names: Vec<String>,
    /// Clear scores or ciphertext handles, depending on the contract flavour
    pub scores: Vec<U256>,
    pub ballots: Vec<u64>,
}

impl PlayerTable {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Tuple returned by `getPlayer(id)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub score: U256,
    pub ballots: u64,
}

impl PlayerRecord {
    /// Score word reinterpreted as a ciphertext handle
    pub fn handle(&self) -> B256 {
        B256::from(self.score.to_be_bytes::<32>())
    }
}

/// Encrypted input produced by an encryption runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<B256>,
    pub input_proof: Bytes,
}

/// Raw EIP-1193 request interface of a wallet or node
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Vec<Value>) -> ChainResult<Value>;
}

/// Parse a hex quantity such as `"0x7a69"`
pub fn parse_quantity(value: &Value) -> ChainResult<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| ChainError::malformed(format!("expected hex quantity, got {value}")))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::malformed(format!("invalid quantity {text}: {e}")))
}

/// Format a quantity the way JSON-RPC expects it
pub fn format_quantity(value: u64) -> Value {
    Value::String(format!("0x{value:x}"))
}

/// Ask a provider which chain it is bound to
pub async fn provider_chain_id(provider: &dyn Eip1193Provider) -> ChainResult<u64> {
    let value = provider.request("eth_chainId", Vec::new()).await?;
    parse_quantity(&value)
}

/// Accounts the provider can sign for
pub async fn provider_accounts(provider: &dyn Eip1193Provider) -> ChainResult<Vec<Address>> {
    let value = provider.request("eth_accounts", Vec::new()).await?;
    serde_json::from_value(value).map_err(|e| ChainError::malformed(e.to_string()))
}

/// Read-only contract access (the "public client")
#[async_trait]
pub trait VotingReader: Send + Sync {
    async fn list_players(&self, contract: Address) -> ChainResult<PlayerTable>;

    async fn get_player(&self, contract: Address, player_id: u32) -> ChainResult<PlayerRecord>;

    async fn total_players(&self, contract: Address) -> ChainResult<u64>;

    async fn admin(&self, contract: Address) -> ChainResult<Address>;
}

/// A submitted transaction awaiting inclusion
#[async_trait]
pub trait PendingTransaction: Send {
    fn hash(&self) -> TxHash;

    /// Wait until the transaction is mined; reverted transactions are errors
    async fn wait(self: Box<Self>) -> ChainResult<TxReceipt>;
}

/// Write access bound to one account
#[async_trait]
pub trait VotingSigner: Send + Sync {
    fn address(&self) -> Address;

    /// `voteFor(uint256,uint8)` on the clear-text contract
    async fn vote_for(
        &self,
        contract: Address,
        player_id: u32,
        rating: u8,
    ) -> ChainResult<Box<dyn PendingTransaction>>;

    /// `voteFor(uint256,bytes32,bytes)` on the encrypted contract
    async fn vote_for_encrypted(
        &self,
        contract: Address,
        player_id: u32,
        handle: B256,
        input_proof: &Bytes,
    ) -> ChainResult<Box<dyn PendingTransaction>>;

    /// `allowAdminToDecrypt(uint256)`
    async fn allow_admin_to_decrypt(
        &self,
        contract: Address,
        player_id: u32,
    ) -> ChainResult<Box<dyn PendingTransaction>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x7a69")).unwrap(), 31337);
        assert_eq!(parse_quantity(&json!("aa36a7")).unwrap(), 11_155_111);
        assert_eq!(
            parse_quantity(&json!(12)).unwrap_err().kind,
            ErrorKind::MalformedPayload
        );
        assert_eq!(format_quantity(31337), json!("0x7a69"));
    }

    #[test]
    fn test_record_handle_is_score_word() {
        let record = PlayerRecord {
            name: "Solar Ace".into(),
            score: U256::from(0x2au64),
            ballots: 1,
        };
        let handle = record.handle();
        assert_eq!(handle[31], 0x2a);
        assert!(handle[..31].iter().all(|b| *b == 0));
    }
}
