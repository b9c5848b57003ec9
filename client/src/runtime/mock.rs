//! In-process encryption runtime
//!
//! [`MockCoprocessor`] keeps every ciphertext in memory together with its
//! access list. It stands in for both the encryption key service and the
//! on-chain coprocessor on development chains.

use super::{EncryptionRuntime, RuntimeFactory, RuntimeLoadStatus, RuntimeParams};
use crate::chain::{provider_chain_id, EncryptedInput};
use crate::errors::{RuntimeError, RuntimeResult};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct Ciphertext {
    value: u64,
    acl: HashSet<Address>,
    /// Input binding: (contract, user, proof) until verified on chain
    input: Option<(Address, Address, B256)>,
}

#[derive(Debug, Default)]
struct CoprocessorState {
    ciphertexts: HashMap<B256, Ciphertext>,
    counter: u64,
    relayer_down: bool,
}

/// Shared ciphertext store with per-handle access lists
#[derive(Debug, Default)]
pub struct MockCoprocessor {
    state: Mutex<CoprocessorState>,
}

impl MockCoprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a relayer outage for encrypt and decrypt requests
    pub fn set_relayer_available(&self, available: bool) {
        self.state.lock().relayer_down = !available;
    }

    pub fn relayer_available(&self) -> bool {
        !self.state.lock().relayer_down
    }

    fn ensure_relayer(&self) -> RuntimeResult<()> {
        if self.state.lock().relayer_down {
            return Err(RuntimeError::RelayerUnavailable(
                "relayer did not respond".to_string(),
            ));
        }
        Ok(())
    }

    fn next_handle(state: &mut CoprocessorState, contract: Address, user: Address) -> B256 {
        state.counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"votechain-ciphertext");
        hasher.update(state.counter.to_be_bytes());
        hasher.update(contract.as_slice());
        hasher.update(user.as_slice());
        B256::from_slice(&hasher.finalize())
    }

    fn input_proof(contract: Address, user: Address, handles: &[B256]) -> B256 {
        let mut hasher = Sha256::new();
        hasher.update(b"votechain-input-proof");
        hasher.update(contract.as_slice());
        hasher.update(user.as_slice());
        for handle in handles {
            hasher.update(handle.as_slice());
        }
        B256::from_slice(&hasher.finalize())
    }

    /// Encrypt values bound to `contract` and `user`
    pub fn encrypt_input(
        &self,
        contract: Address,
        user: Address,
        values: &[u32],
    ) -> RuntimeResult<EncryptedInput> {
        self.ensure_relayer()?;

        let mut state = self.state.lock();
        let handles: Vec<B256> = values
            .iter()
            .map(|_| Self::next_handle(&mut state, contract, user))
            .collect();
        let proof = Self::input_proof(contract, user, &handles);

        for (handle, value) in handles.iter().zip(values) {
            state.ciphertexts.insert(
                *handle,
                Ciphertext {
                    value: u64::from(*value),
                    acl: HashSet::new(),
                    input: Some((contract, user, proof)),
                },
            );
        }

        debug!("Encrypted {} value(s) for {}", handles.len(), user);
        Ok(EncryptedInput {
            handles,
            input_proof: Bytes::copy_from_slice(proof.as_slice()),
        })
    }

    /// Check an input handle against its proof; the caller contract gains access
    pub fn verify_input(
        &self,
        handle: B256,
        proof: &[u8],
        contract: Address,
        user: Address,
    ) -> RuntimeResult<u64> {
        let mut state = self.state.lock();
        let ciphertext = state
            .ciphertexts
            .get_mut(&handle)
            .ok_or(RuntimeError::UnknownHandle(handle))?;

        match ciphertext.input {
            Some((bound_contract, bound_user, expected))
                if bound_contract == contract
                    && bound_user == user
                    && proof == expected.as_slice() =>
            {
                ciphertext.acl.insert(contract);
                Ok(ciphertext.value)
            }
            _ => Err(RuntimeError::InvalidProof),
        }
    }

    /// Ciphertext of a public constant
    pub fn trivial_encrypt(&self, value: u64) -> B256 {
        let mut state = self.state.lock();
        let handle = Self::next_handle(&mut state, Address::ZERO, Address::ZERO);
        state.ciphertexts.insert(
            handle,
            Ciphertext {
                value,
                acl: HashSet::new(),
                input: None,
            },
        );
        handle
    }

    /// Homomorphic addition producing a fresh handle with an empty access list
    pub fn add(&self, lhs: B256, rhs: B256) -> RuntimeResult<B256> {
        let mut state = self.state.lock();
        let a = state
            .ciphertexts
            .get(&lhs)
            .ok_or(RuntimeError::UnknownHandle(lhs))?
            .value;
        let b = state
            .ciphertexts
            .get(&rhs)
            .ok_or(RuntimeError::UnknownHandle(rhs))?
            .value;
        let sum = a.checked_add(b).ok_or(RuntimeError::Overflow)?;

        let handle = Self::next_handle(&mut state, Address::ZERO, Address::ZERO);
        state.ciphertexts.insert(
            handle,
            Ciphertext {
                value: sum,
                acl: HashSet::new(),
                input: None,
            },
        );
        Ok(handle)
    }

    /// Grant `account` access to `handle`
    pub fn allow(&self, handle: B256, account: Address) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        let ciphertext = state
            .ciphertexts
            .get_mut(&handle)
            .ok_or(RuntimeError::UnknownHandle(handle))?;
        ciphertext.acl.insert(account);
        Ok(())
    }

    pub fn is_allowed(&self, handle: B256, account: Address) -> bool {
        self.state
            .lock()
            .ciphertexts
            .get(&handle)
            .map(|c| c.acl.contains(&account))
            .unwrap_or(false)
    }

    /// Reveal a handle; both the contract and the user must be on its access list
    pub fn decrypt(&self, handle: B256, contract: Address, user: Address) -> RuntimeResult<u64> {
        self.ensure_relayer()?;

        let state = self.state.lock();
        let ciphertext = state
            .ciphertexts
            .get(&handle)
            .ok_or(RuntimeError::UnknownHandle(handle))?;

        if !ciphertext.acl.contains(&contract) || !ciphertext.acl.contains(&user) {
            return Err(RuntimeError::AccessDenied { handle, user });
        }
        Ok(ciphertext.value)
    }
}

/// Runtime instance bound to one chain
#[derive(Debug, Clone)]
pub struct MockRuntime {
    coprocessor: Arc<MockCoprocessor>,
    chain_id: u64,
}

impl MockRuntime {
    pub fn new(coprocessor: Arc<MockCoprocessor>, chain_id: u64) -> Self {
        Self {
            coprocessor,
            chain_id,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl EncryptionRuntime for MockRuntime {
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[u32],
    ) -> RuntimeResult<EncryptedInput> {
        self.coprocessor.encrypt_input(contract, user, values)
    }

    async fn user_decrypt(
        &self,
        handle: B256,
        contract: Address,
        user: Address,
    ) -> RuntimeResult<u64> {
        self.coprocessor.decrypt(handle, contract, user)
    }
}

/// Builds [`MockRuntime`]s for the configured mock chains
#[derive(Debug, Clone)]
pub struct MockRuntimeFactory {
    coprocessor: Arc<MockCoprocessor>,
    init_delay: Duration,
}

impl MockRuntimeFactory {
    pub fn new(coprocessor: Arc<MockCoprocessor>) -> Self {
        Self {
            coprocessor,
            init_delay: Duration::ZERO,
        }
    }

    /// Simulated initialisation time, interruptible by the abort signal
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn coprocessor(&self) -> &Arc<MockCoprocessor> {
        &self.coprocessor
    }
}

#[async_trait]
impl RuntimeFactory for MockRuntimeFactory {
    async fn create(&self, params: RuntimeParams) -> RuntimeResult<Arc<dyn EncryptionRuntime>> {
        let chain_id = params.chain_id.ok_or(RuntimeError::MissingChain)?;
        let rpc_url = params
            .mock_chains
            .get(&chain_id)
            .ok_or(RuntimeError::UnsupportedChain(chain_id))?;
        debug!("Creating mock runtime for chain {} ({})", chain_id, rpc_url);

        for status in [
            RuntimeLoadStatus::SdkLoading,
            RuntimeLoadStatus::SdkLoaded,
            RuntimeLoadStatus::SdkInitializing,
        ] {
            if params.signal.is_aborted() {
                return Err(RuntimeError::Aborted);
            }
            params.report(status);
        }

        if !self.init_delay.is_zero() {
            tokio::select! {
                _ = params.signal.aborted() => return Err(RuntimeError::Aborted),
                _ = tokio::time::sleep(self.init_delay) => {}
            }
        }
        params.report(RuntimeLoadStatus::SdkInitialized);

        params.report(RuntimeLoadStatus::Creating);
        let actual = provider_chain_id(params.provider.as_ref()).await?;
        if actual != chain_id {
            return Err(RuntimeError::ChainMismatch {
                expected: chain_id,
                actual,
            });
        }

        if params.signal.is_aborted() {
            return Err(RuntimeError::Aborted);
        }
        Ok(Arc::new(MockRuntime::new(self.coprocessor.clone(), chain_id)))
    }
}
