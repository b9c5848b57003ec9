//! Wallet Session
//!
//! The [`WalletAdapter`] turns wallet connection events into one
//! [`SessionState`] value and publishes it through a `watch` channel. The
//! orchestrator only reads that channel.
//!
//! Signer hydration is asynchronous. Each event bumps a hydration counter,
//! so a signer resolved for an older event is dropped instead of published.

use crate::chain::{Eip1193Provider, VotingReader, VotingSigner};
use crate::errors::ChainResult;
use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Snapshot of the wallet connection
#[derive(Clone, Default)]
pub struct SessionState {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub is_connected: bool,
    pub signer: Option<Arc<dyn VotingSigner>>,
    /// Raw EIP-1193 provider of the connected wallet
    pub provider: Option<Arc<dyn Eip1193Provider>>,
    /// Read-only client; available without a wallet
    pub read_client: Option<Arc<dyn VotingReader>>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("is_connected", &self.is_connected)
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .field("provider", &self.provider.is_some())
            .field("read_client", &self.read_client.is_some())
            .finish()
    }
}

/// Wallet lifecycle events
#[derive(Clone)]
pub enum WalletEvent {
    Connected {
        address: Address,
        chain_id: u64,
        provider: Arc<dyn Eip1193Provider>,
    },
    AccountChanged {
        address: Address,
    },
    ChainChanged {
        chain_id: u64,
    },
    Disconnected,
}

impl fmt::Debug for WalletEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletEvent::Connected {
                address, chain_id, ..
            } => write!(f, "Connected({address}, chain {chain_id})"),
            WalletEvent::AccountChanged { address } => write!(f, "AccountChanged({address})"),
            WalletEvent::ChainChanged { chain_id } => write!(f, "ChainChanged({chain_id})"),
            WalletEvent::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Builds clients for a wallet connection
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Read-only client for a chain, or for the default chain when `None`
    fn public_client(&self, chain_id: Option<u64>) -> Option<Arc<dyn VotingReader>>;

    /// Signer for `address` behind `provider`
    async fn signer(
        &self,
        provider: Arc<dyn Eip1193Provider>,
        address: Address,
        chain_id: u64,
    ) -> ChainResult<Arc<dyn VotingSigner>>;
}

#[derive(Clone)]
struct Connection {
    address: Address,
    chain_id: u64,
    provider: Arc<dyn Eip1193Provider>,
}

/// Owns the session state
pub struct WalletAdapter {
    backend: Arc<dyn WalletBackend>,
    state: watch::Sender<SessionState>,
    connection: Mutex<Option<Connection>>,
    hydration: AtomicU64,
}

impl WalletAdapter {
    pub fn new(backend: Arc<dyn WalletBackend>) -> Self {
        let initial = SessionState {
            read_client: backend.public_client(None),
            ..Default::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            backend,
            state,
            connection: Mutex::new(None),
            hydration: AtomicU64::new(0),
        }
    }

    /// Current session snapshot
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Apply a wallet event and wait for the signer to hydrate
    pub async fn apply(&self, event: WalletEvent) {
        debug!("Wallet event: {:?}", event);

        // generations and published states follow the order of connection writes
        let (connection, generation) = {
            let mut connection = self.connection.lock();
            match event {
                WalletEvent::Connected {
                    address,
                    chain_id,
                    provider,
                } => {
                    *connection = Some(Connection {
                        address,
                        chain_id,
                        provider,
                    });
                }
                WalletEvent::AccountChanged { address } => match connection.as_mut() {
                    Some(c) => c.address = address,
                    None => warn!("Account change without a connected wallet"),
                },
                WalletEvent::ChainChanged { chain_id } => match connection.as_mut() {
                    Some(c) => c.chain_id = chain_id,
                    None => warn!("Chain change without a connected wallet"),
                },
                WalletEvent::Disconnected => *connection = None,
            }
            let generation = self.hydration.fetch_add(1, Ordering::SeqCst) + 1;

            let Some(current) = connection.clone() else {
                info!("Wallet disconnected");
                self.state.send_replace(SessionState {
                    read_client: self.backend.public_client(None),
                    ..Default::default()
                });
                return;
            };
            self.publish_pending(&current);
            (current, generation)
        };

        let signer = self
            .backend
            .signer(
                connection.provider.clone(),
                connection.address,
                connection.chain_id,
            )
            .await;

        let _guard = self.connection.lock();
        if self.hydration.load(Ordering::SeqCst) != generation {
            debug!("Dropping signer from superseded wallet event #{}", generation);
            return;
        }

        match signer {
            Ok(signer) => {
                info!(
                    "Wallet {} connected on chain {}",
                    connection.address, connection.chain_id
                );
                self.state.send_modify(|state| {
                    state.signer = Some(signer);
                    state.provider = Some(connection.provider);
                });
            }
            Err(e) => warn!("Failed to hydrate signer for {}: {}", connection.address, e),
        }
    }

    /// Connected state while the signer hydrates
    ///
    /// A new provider is published together with its signer; an unchanged
    /// one stays.
    fn publish_pending(&self, connection: &Connection) {
        let provider = self
            .state
            .borrow()
            .provider
            .clone()
            .filter(|current| Arc::ptr_eq(current, &connection.provider));
        self.state.send_replace(SessionState {
            address: Some(connection.address),
            chain_id: Some(connection.chain_id),
            is_connected: true,
            signer: None,
            provider,
            read_client: self.backend.public_client(Some(connection.chain_id)),
        });
    }
}
