//! JSON-RPC Wallet Backend

use crate::client::{RpcReader, RpcSigner, DEFAULT_POLL_INTERVAL, DEFAULT_RECEIPT_TIMEOUT};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use votechain_client::chain::{
    provider_accounts, provider_chain_id, Eip1193Provider, VotingReader, VotingSigner,
};
use votechain_client::contract::ContractKind;
use votechain_client::errors::{ChainError, ChainResult, ErrorKind};
use votechain_client::session::WalletBackend;

/// Builds RPC readers and signers for one configured chain
pub struct RpcWalletBackend {
    read_provider: Arc<dyn Eip1193Provider>,
    chain_id: u64,
    kind: ContractKind,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcWalletBackend {
    /// `read_provider` serves the public client for `chain_id`
    pub fn new(read_provider: Arc<dyn Eip1193Provider>, chain_id: u64, kind: ContractKind) -> Self {
        Self {
            read_provider,
            chain_id,
            kind,
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_polling(mut self, poll_interval: Duration, receipt_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.receipt_timeout = receipt_timeout;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl WalletBackend for RpcWalletBackend {
    fn public_client(&self, chain_id: Option<u64>) -> Option<Arc<dyn VotingReader>> {
        match chain_id {
            Some(id) if id != self.chain_id => {
                debug!("No public client for chain {}", id);
                None
            }
            _ => Some(Arc::new(RpcReader::new(self.read_provider.clone(), self.kind))),
        }
    }

    async fn signer(
        &self,
        provider: Arc<dyn Eip1193Provider>,
        address: Address,
        chain_id: u64,
    ) -> ChainResult<Arc<dyn VotingSigner>> {
        let actual = provider_chain_id(provider.as_ref()).await?;
        if actual != chain_id {
            return Err(ChainError::new(
                ErrorKind::Unknown,
                format!("wallet reports chain {actual}, session expects {chain_id}"),
            ));
        }

        let accounts = provider_accounts(provider.as_ref()).await?;
        if !accounts.contains(&address) {
            return Err(ChainError::new(
                ErrorKind::Unknown,
                format!("wallet cannot sign for {address}"),
            ));
        }

        Ok(Arc::new(
            RpcSigner::new(provider, address)
                .with_polling(self.poll_interval, self.receipt_timeout),
        ))
    }
}
