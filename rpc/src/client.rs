//! Contract Clients
//!
//! [`RpcReader`] and [`RpcSigner`] speak to the voting contract through any
//! [`Eip1193Provider`]: an [`HttpProvider`](crate::HttpProvider) or an
//! injected wallet.

use crate::codec;
use crate::errors::RpcError;
use crate::types::{TransactionReceipt, TransactionRequest, LATEST_BLOCK};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use votechain_client::chain::{
    Eip1193Provider, PendingTransaction, PlayerRecord, PlayerTable, TxHash, TxReceipt,
    VotingReader, VotingSigner,
};
use votechain_client::contract::ContractKind;
use votechain_client::errors::{ChainError, ChainResult};

/// Interval between receipt polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long to wait for a transaction to be mined
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

fn to_json<T: serde::Serialize>(value: &T) -> ChainResult<Value> {
    serde_json::to_value(value).map_err(|e| ChainError::malformed(e.to_string()))
}

/// Read-only access through `eth_call`
pub struct RpcReader {
    provider: Arc<dyn Eip1193Provider>,
    kind: ContractKind,
}

impl RpcReader {
    pub fn new(provider: Arc<dyn Eip1193Provider>, kind: ContractKind) -> Self {
        Self { provider, kind }
    }

    async fn eth_call(&self, contract: Address, calldata: Vec<u8>) -> ChainResult<Bytes> {
        let request = to_json(&TransactionRequest::call(contract, calldata))?;
        let result = self
            .provider
            .request("eth_call", vec![request, json!(LATEST_BLOCK)])
            .await?;
        serde_json::from_value(result).map_err(|e| ChainError::malformed(e.to_string()))
    }
}

#[async_trait]
impl VotingReader for RpcReader {
    async fn list_players(&self, contract: Address) -> ChainResult<PlayerTable> {
        let data = self
            .eth_call(contract, codec::list_players_calldata())
            .await?;
        Ok(codec::decode_list_players(self.kind, &data)?)
    }

    async fn get_player(&self, contract: Address, player_id: u32) -> ChainResult<PlayerRecord> {
        let data = self
            .eth_call(contract, codec::get_player_calldata(player_id))
            .await?;
        Ok(codec::decode_get_player(self.kind, &data)?)
    }

    async fn total_players(&self, contract: Address) -> ChainResult<u64> {
        let data = self
            .eth_call(contract, codec::total_players_calldata())
            .await?;
        Ok(codec::decode_total_players(&data)?)
    }

    async fn admin(&self, contract: Address) -> ChainResult<Address> {
        let data = self.eth_call(contract, codec::admin_calldata()).await?;
        Ok(codec::decode_admin(&data)?)
    }
}

/// Signs through the provider's `eth_sendTransaction`
pub struct RpcSigner {
    provider: Arc<dyn Eip1193Provider>,
    address: Address,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcSigner {
    pub fn new(provider: Arc<dyn Eip1193Provider>, address: Address) -> Self {
        Self {
            provider,
            address,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, receipt_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.receipt_timeout = receipt_timeout;
        self
    }

    async fn send(
        &self,
        contract: Address,
        calldata: Vec<u8>,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        let request = to_json(&TransactionRequest::call(contract, calldata).from(self.address))?;
        let result = self
            .provider
            .request("eth_sendTransaction", vec![request])
            .await?;
        let hash: B256 =
            serde_json::from_value(result).map_err(|e| ChainError::malformed(e.to_string()))?;
        info!("Submitted transaction {} from {}", hash, self.address);

        Ok(Box::new(RpcPendingTx {
            provider: self.provider.clone(),
            hash,
            poll_interval: self.poll_interval,
            timeout: self.receipt_timeout,
        }))
    }
}

#[async_trait]
impl VotingSigner for RpcSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn vote_for(
        &self,
        contract: Address,
        player_id: u32,
        rating: u8,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(contract, codec::vote_for_calldata(player_id, rating))
            .await
    }

    async fn vote_for_encrypted(
        &self,
        contract: Address,
        player_id: u32,
        handle: B256,
        input_proof: &Bytes,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(
            contract,
            codec::vote_for_encrypted_calldata(player_id, handle, input_proof),
        )
        .await
    }

    async fn allow_admin_to_decrypt(
        &self,
        contract: Address,
        player_id: u32,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.send(contract, codec::allow_admin_to_decrypt_calldata(player_id))
            .await
    }
}

/// Transaction polled via `eth_getTransactionReceipt`
pub struct RpcPendingTx {
    provider: Arc<dyn Eip1193Provider>,
    hash: TxHash,
    poll_interval: Duration,
    timeout: Duration,
}

impl RpcPendingTx {
    async fn poll(&self) -> ChainResult<TransactionReceipt> {
        loop {
            let result = self
                .provider
                .request("eth_getTransactionReceipt", vec![json!(self.hash)])
                .await?;
            if !result.is_null() {
                return serde_json::from_value(result)
                    .map_err(|e| ChainError::malformed(e.to_string()));
            }
            debug!("Receipt for {} not available yet", self.hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl PendingTransaction for RpcPendingTx {
    fn hash(&self) -> TxHash {
        self.hash
    }

    async fn wait(self: Box<Self>) -> ChainResult<TxReceipt> {
        let receipt = tokio::time::timeout(self.timeout, self.poll())
            .await
            .map_err(|_| ChainError::from(RpcError::ReceiptTimeout(self.hash)))??;

        if !receipt.succeeded() {
            return Err(RpcError::Reverted(self.hash).into());
        }

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block(),
        })
    }
}
