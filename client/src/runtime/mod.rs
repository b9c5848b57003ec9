//! Encryption Runtime
//!
//! An encryption runtime turns clear ratings into ciphertext handles with an
//! input proof, and reveals handles the caller is allowed to see.
//!
//! ```text
//!   provider / chain change
//!            │
//!            ▼
//!   ┌─────────────────┐  create(params)  ┌─────────────────┐
//!   │  RuntimeBridge  │ ───────────────▶ │  RuntimeFactory │
//!   │ idle→loading→.. │ ◀─────────────── │  (mock, relayer)│
//!   └─────────────────┘   instance/err   └─────────────────┘
//! ```

pub mod bridge;
pub mod mock;

pub use bridge::{RuntimeBridge, RuntimeStatus};
pub use mock::{MockCoprocessor, MockRuntime, MockRuntimeFactory};

use crate::chain::{EncryptedInput, Eip1193Provider};
use crate::errors::RuntimeResult;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// A constructed encryption client
#[async_trait]
pub trait EncryptionRuntime: Send + Sync {
    /// Encrypt 32-bit values for `contract`, bound to `user`
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[u32],
    ) -> RuntimeResult<EncryptedInput>;

    /// Reveal a handle to `user`
    async fn user_decrypt(&self, handle: B256, contract: Address, user: Address)
        -> RuntimeResult<u64>;
}

/// Start an encrypted input for `contract` on behalf of `user`
pub fn create_encrypted_input(
    runtime: &Arc<dyn EncryptionRuntime>,
    contract: Address,
    user: Address,
) -> EncryptedInputBuilder {
    EncryptedInputBuilder {
        runtime: runtime.clone(),
        contract,
        user,
        values: Vec::new(),
    }
}

/// Collects values before a single `encrypt` call
pub struct EncryptedInputBuilder {
    runtime: Arc<dyn EncryptionRuntime>,
    contract: Address,
    user: Address,
    values: Vec<u32>,
}

impl EncryptedInputBuilder {
    pub fn add32(mut self, value: u32) -> Self {
        self.values.push(value);
        self
    }

    pub async fn encrypt(self) -> RuntimeResult<EncryptedInput> {
        self.runtime
            .encrypt(self.contract, self.user, &self.values)
            .await
    }
}

/// Construction phases reported through the status callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeLoadStatus {
    SdkLoading,
    SdkLoaded,
    SdkInitializing,
    SdkInitialized,
    Creating,
}

impl RuntimeLoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeLoadStatus::SdkLoading => "sdk-loading",
            RuntimeLoadStatus::SdkLoaded => "sdk-loaded",
            RuntimeLoadStatus::SdkInitializing => "sdk-initializing",
            RuntimeLoadStatus::SdkInitialized => "sdk-initialized",
            RuntimeLoadStatus::Creating => "creating",
        }
    }
}

impl fmt::Display for RuntimeLoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback receiving construction phases
pub type StatusCallback = Arc<dyn Fn(RuntimeLoadStatus) + Send + Sync>;

/// Aborts one in-flight construction
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observed by a factory to stop early
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A dropped handle counts as aborted
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once aborted
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

/// Create a linked abort handle and signal
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Inputs of one construction
#[derive(Clone)]
pub struct RuntimeParams {
    pub provider: Arc<dyn Eip1193Provider>,
    pub chain_id: Option<u64>,
    /// Chains served by a local mock, with their RPC endpoint
    pub mock_chains: HashMap<u64, String>,
    pub signal: AbortSignal,
    pub on_status: StatusCallback,
}

impl RuntimeParams {
    pub fn report(&self, status: RuntimeLoadStatus) {
        (self.on_status)(status);
    }
}

/// Asynchronous, cancellable runtime construction
#[async_trait]
pub trait RuntimeFactory: Send + Sync {
    async fn create(&self, params: RuntimeParams) -> RuntimeResult<Arc<dyn EncryptionRuntime>>;
}
