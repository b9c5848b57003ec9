//! HTTP JSON-RPC Provider

use crate::errors::{RpcError, RpcResult};
use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::trace;
use votechain_client::chain::Eip1193Provider;
use votechain_client::errors::{ChainError, ChainResult};

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Node endpoint speaking Ethereum JSON-RPC over HTTP
///
/// A node with unlocked accounts (Hardhat, Anvil) doubles as a wallet:
/// `eth_accounts` lists signers and `eth_sendTransaction` signs.
#[derive(Clone)]
pub struct HttpProvider {
    client: HttpClient,
    url: String,
}

impl fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProvider").field("url", &self.url).finish()
    }
}

impl HttpProvider {
    pub fn new(url: &str) -> RpcResult<Self> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> RpcResult<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(timeout)
            .build(url)
            .map_err(|e| RpcError::InvalidEndpoint(format!("{url}: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Typed request
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<R> {
        trace!("-> {} {:?}", method, params);
        let mut array = ArrayParams::new();
        for param in params {
            array
                .insert(param)
                .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        }
        Ok(self.client.request(method, array).await?)
    }
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> ChainResult<Value> {
        self.call(method, params).await.map_err(ChainError::from)
    }
}
