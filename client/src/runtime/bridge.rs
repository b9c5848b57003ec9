//! Encryption runtime bridge
//!
//! State machine around a [`RuntimeFactory`]:
//!
//! ```text
//! idle ──▶ loading ──▶ ready
//!   ▲         │
//!   │         └──────▶ error
//!   └── provider/chain change (aborts in-flight construction)
//! ```
//!
//! Only the latest request may publish its result. A completion whose
//! generation has been superseded, or whose signal was aborted, is dropped
//! without touching the state.

use super::{abort_pair, AbortHandle, AbortSignal, EncryptionRuntime, RuntimeFactory, RuntimeParams};
use crate::chain::Eip1193Provider;
use crate::errors::{RuntimeError, RuntimeResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable bridge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Default)]
struct BridgeInner {
    generation: u64,
    abort: Option<AbortHandle>,
    instance: Option<Arc<dyn EncryptionRuntime>>,
    error: Option<RuntimeError>,
    provider: Option<Arc<dyn Eip1193Provider>>,
    chain_id: Option<u64>,
}

struct Shared {
    inner: Mutex<BridgeInner>,
    status: watch::Sender<RuntimeStatus>,
}

impl Shared {
    fn complete(
        &self,
        generation: u64,
        signal: &AbortSignal,
        result: RuntimeResult<Arc<dyn EncryptionRuntime>>,
    ) {
        let mut inner = self.inner.lock();

        if inner.generation != generation || signal.is_aborted() {
            debug!(
                "Discarding superseded runtime construction #{} (latest #{})",
                generation, inner.generation
            );
            return;
        }

        inner.abort = None;
        match result {
            Ok(instance) => {
                info!("Encryption runtime ready (request #{})", generation);
                inner.instance = Some(instance);
                inner.error = None;
                self.status.send_replace(RuntimeStatus::Ready);
            }
            Err(e) => {
                warn!("Encryption runtime construction failed: {}", e);
                inner.instance = None;
                inner.error = Some(e);
                self.status.send_replace(RuntimeStatus::Error);
            }
        }
    }
}

fn same_provider(
    a: &Option<Arc<dyn Eip1193Provider>>,
    b: &Option<Arc<dyn Eip1193Provider>>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::eq(
            Arc::as_ptr(a) as *const (),
            Arc::as_ptr(b) as *const (),
        ),
        (None, None) => true,
        _ => false,
    }
}

/// Owns at most one live runtime instance
pub struct RuntimeBridge {
    factory: Arc<dyn RuntimeFactory>,
    mock_chains: HashMap<u64, String>,
    enabled: bool,
    shared: Arc<Shared>,
}

impl RuntimeBridge {
    pub fn new(
        factory: Arc<dyn RuntimeFactory>,
        mock_chains: HashMap<u64, String>,
        enabled: bool,
    ) -> Self {
        let (status, _) = watch::channel(RuntimeStatus::Idle);
        Self {
            factory,
            mock_chains,
            enabled,
            shared: Arc::new(Shared {
                inner: Mutex::new(BridgeInner::default()),
                status,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Refresh only when the provider or chain differs from the last request
    pub fn update(
        &self,
        provider: Option<Arc<dyn Eip1193Provider>>,
        chain_id: Option<u64>,
    ) -> Option<JoinHandle<()>> {
        {
            let inner = self.shared.inner.lock();
            let unchanged = same_provider(&inner.provider, &provider) && inner.chain_id == chain_id;
            if unchanged && inner.generation > 0 {
                return None;
            }
        }
        self.refresh(provider, chain_id)
    }

    /// Abort any in-flight construction, reset to idle and start over
    ///
    /// Returns the construction task when one was started.
    pub fn refresh(
        &self,
        provider: Option<Arc<dyn Eip1193Provider>>,
        chain_id: Option<u64>,
    ) -> Option<JoinHandle<()>> {
        let mut inner = self.shared.inner.lock();

        if let Some(previous) = inner.abort.take() {
            previous.abort();
        }
        inner.generation += 1;
        inner.instance = None;
        inner.error = None;
        inner.provider = provider.clone();
        inner.chain_id = chain_id;
        self.shared.status.send_replace(RuntimeStatus::Idle);

        let provider = match provider {
            Some(provider) if self.enabled => provider,
            _ => {
                debug!("Encryption runtime idle (enabled={})", self.enabled);
                return None;
            }
        };

        let generation = inner.generation;
        let (handle, signal) = abort_pair();
        inner.abort = Some(handle);
        self.shared.status.send_replace(RuntimeStatus::Loading);
        drop(inner);

        debug!(
            "Creating encryption runtime #{} for chain {:?}",
            generation, chain_id
        );

        let params = RuntimeParams {
            provider,
            chain_id,
            mock_chains: self.mock_chains.clone(),
            signal: signal.clone(),
            on_status: Arc::new(move |status| {
                debug!("Runtime #{} construction status: {}", generation, status)
            }),
        };

        let factory = self.factory.clone();
        let shared = self.shared.clone();
        Some(tokio::spawn(async move {
            let result = factory.create(params).await;
            shared.complete(generation, &signal, result);
        }))
    }

    pub fn status(&self) -> RuntimeStatus {
        *self.shared.status.borrow()
    }

    /// Ready instance, if any
    pub fn instance(&self) -> Option<Arc<dyn EncryptionRuntime>> {
        self.shared.inner.lock().instance.clone()
    }

    /// Error of the last failed construction
    pub fn error(&self) -> Option<RuntimeError> {
        self.shared.inner.lock().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RuntimeStatus> {
        self.shared.status.subscribe()
    }

    /// Wait until no construction is in flight
    pub async fn settled(&self) -> RuntimeStatus {
        let mut rx = self.subscribe();
        let status = match rx.wait_for(|s| *s != RuntimeStatus::Loading).await {
            Ok(status) => *status,
            Err(_) => RuntimeStatus::Idle,
        };
        status
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.inner.lock().abort.take() {
            handle.abort();
        }
    }
}
