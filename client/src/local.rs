//! In-memory development chain
//!
//! [`LocalChain`] runs either voting contract flavour inside the process,
//! answering the same reads and writes as a deployed contract (including its
//! revert reasons). Encrypted scores live in a shared [`MockCoprocessor`].
//! Faults can be queued per method to exercise wallet rejections, reverts
//! and relayer outages.

use crate::chain::{
    format_quantity, provider_accounts, Eip1193Provider, PendingTransaction, PlayerRecord,
    PlayerTable, TxHash, TxReceipt, VotingReader, VotingSigner,
};
use crate::contract::{AddressBook, ContractKind};
use crate::errors::{
    ChainError, ChainResult, ErrorKind, REVERT_ALREADY_VOTED, REVERT_INVALID_PLAYER,
    REVERT_RATING_RANGE,
};
use crate::networks::LOCAL_CHAIN_ID;
use crate::orchestrator::RATING_RANGE;
use crate::runtime::{MockCoprocessor, MockRuntimeFactory};
use crate::session::{WalletBackend, WalletEvent};
use alloy_primitives::{address, Address, Bytes, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// First development account; deploys the contract and acts as admin
pub const DEV_ADMIN: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Development accounts available for voting
pub const DEV_ACCOUNTS: [Address; 3] = [
    DEV_ADMIN,
    address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
    address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
];

/// Roster deployed with the clear-text contract
pub const SIMPLE_PLAYERS: [&str; 3] = ["Astra Striker", "Midnight Playmaker", "Guardian Titan"];

/// Roster deployed with the encrypted contract
pub const ENCRYPTED_PLAYERS: [&str; 3] = ["Solar Ace", "Neon Pivot", "Crimson Wall"];

/// Contract methods that accept injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalMethod {
    ListPlayers,
    GetPlayer,
    VoteFor,
    AllowAdminToDecrypt,
}

/// A one-shot failure returned by the next call of a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Wallet declined to sign (EIP-1193 code 4001)
    UserRejected,
    /// Execution reverted with a reason string
    Revert(String),
    /// Relayer did not answer
    RelayerDown,
    /// Node unreachable
    Transport,
}

impl Fault {
    fn into_error(self) -> ChainError {
        match self {
            Fault::UserRejected => ChainError::new(
                ErrorKind::UserRejected,
                "User denied transaction signature (code 4001)",
            ),
            Fault::Revert(reason) => ChainError::revert(reason),
            Fault::RelayerDown => {
                ChainError::new(ErrorKind::RelayerUnavailable, "Relayer didn't respond")
            }
            Fault::Transport => ChainError::transport("connection refused"),
        }
    }
}

#[derive(Debug, Clone)]
struct LocalPlayer {
    name: String,
    /// Clear score, or the handle word in encrypted mode
    score: U256,
    ballots: u64,
    last_requester: Option<Address>,
}

#[derive(Debug, Default)]
struct LocalState {
    players: Vec<LocalPlayer>,
    voted: HashSet<Address>,
    block_number: u64,
    tx_counter: u64,
    faults: HashMap<LocalMethod, VecDeque<Fault>>,
    calls: HashMap<LocalMethod, usize>,
}

impl LocalState {
    fn enter(&mut self, method: LocalMethod) -> ChainResult<()> {
        *self.calls.entry(method).or_default() += 1;
        match self.faults.get_mut(&method).and_then(|q| q.pop_front()) {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }

    fn player(&self, player_id: u32) -> ChainResult<&LocalPlayer> {
        self.players
            .get(player_id as usize)
            .ok_or_else(|| ChainError::revert(REVERT_INVALID_PLAYER))
    }

    fn mine(&mut self, from: Address) -> TxReceipt {
        self.tx_counter += 1;
        self.block_number += 1;

        let mut hasher = Sha256::new();
        hasher.update(b"votechain-local-tx");
        hasher.update(self.tx_counter.to_be_bytes());
        hasher.update(from.as_slice());
        TxReceipt {
            transaction_hash: B256::from_slice(&hasher.finalize()),
            block_number: Some(self.block_number),
        }
    }
}

/// One voting contract deployed on an in-process chain
#[derive(Debug)]
pub struct LocalChain {
    kind: ContractKind,
    chain_id: u64,
    contract: Address,
    admin: Address,
    accounts: Vec<Address>,
    coprocessor: Arc<MockCoprocessor>,
    state: Mutex<LocalState>,
}

impl LocalChain {
    /// Deploy `players` with the given contract flavour
    pub fn new(kind: ContractKind, players: &[&str]) -> Self {
        let coprocessor = Arc::new(MockCoprocessor::new());
        let contract = AddressBook::builtin(kind)
            .get(LOCAL_CHAIN_ID)
            .map(|d| d.address)
            .unwrap_or(Address::ZERO);

        let players = players
            .iter()
            .map(|name| {
                let score = match kind {
                    ContractKind::Simple => U256::ZERO,
                    ContractKind::Encrypted => {
                        let zero = coprocessor.trivial_encrypt(0);
                        // handle was just created
                        let _ = coprocessor.allow(zero, contract);
                        let _ = coprocessor.allow(zero, DEV_ADMIN);
                        U256::from_be_bytes(zero.0)
                    }
                };
                LocalPlayer {
                    name: name.to_string(),
                    score,
                    ballots: 0,
                    last_requester: None,
                }
            })
            .collect();

        debug!(
            "Deployed {} at {} on local chain {}",
            kind.contract_name(),
            contract,
            LOCAL_CHAIN_ID
        );

        Self {
            kind,
            chain_id: LOCAL_CHAIN_ID,
            contract,
            admin: DEV_ADMIN,
            accounts: DEV_ACCOUNTS.to_vec(),
            coprocessor,
            state: Mutex::new(LocalState {
                players,
                ..Default::default()
            }),
        }
    }

    /// Clear-text contract with its demo roster
    pub fn simple() -> Self {
        Self::new(ContractKind::Simple, &SIMPLE_PLAYERS)
    }

    /// Encrypted contract with its demo roster
    pub fn encrypted() -> Self {
        Self::new(ContractKind::Encrypted, &ENCRYPTED_PLAYERS)
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn admin_address(&self) -> Address {
        self.admin
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn coprocessor(&self) -> &Arc<MockCoprocessor> {
        &self.coprocessor
    }

    /// Runtime factory sharing this chain's coprocessor
    pub fn runtime_factory(&self) -> MockRuntimeFactory {
        MockRuntimeFactory::new(self.coprocessor.clone())
    }

    /// Queue a fault for the next call of `method`
    pub fn inject_fault(&self, method: LocalMethod, fault: Fault) {
        self.state
            .lock()
            .faults
            .entry(method)
            .or_default()
            .push_back(fault);
    }

    /// How many times `method` was called, faults included
    pub fn call_count(&self, method: LocalMethod) -> usize {
        self.state.lock().calls.get(&method).copied().unwrap_or(0)
    }

    pub fn has_voted(&self, voter: Address) -> bool {
        self.state.lock().voted.contains(&voter)
    }

    /// Account that last asked for decrypt access on a player
    pub fn last_requester(&self, player_id: u32) -> Option<Address> {
        self.state
            .lock()
            .players
            .get(player_id as usize)
            .and_then(|p| p.last_requester)
    }

    /// Wallet connection event for one of the development accounts
    pub fn connect(self: &Arc<Self>, account: Address) -> WalletEvent {
        WalletEvent::Connected {
            address: account,
            chain_id: self.chain_id,
            provider: self.clone(),
        }
    }

    /// Signer for `account`
    pub fn signer(self: &Arc<Self>, account: Address) -> LocalSigner {
        LocalSigner {
            chain: self.clone(),
            address: account,
        }
    }

    fn check_contract(&self, contract: Address) -> ChainResult<()> {
        if contract != self.contract {
            return Err(ChainError::new(
                ErrorKind::CallException,
                format!("no contract code at {contract}"),
            ));
        }
        Ok(())
    }

    fn vote_clear(&self, from: Address, player_id: u32, rating: u8) -> ChainResult<TxReceipt> {
        let mut state = self.state.lock();
        state.enter(LocalMethod::VoteFor)?;

        if self.kind != ContractKind::Simple {
            return Err(ChainError::new(
                ErrorKind::CallException,
                "function selector was not recognized",
            ));
        }
        state.player(player_id)?;
        if state.voted.contains(&from) {
            return Err(ChainError::revert(REVERT_ALREADY_VOTED));
        }
        if !RATING_RANGE.contains(&rating) {
            return Err(ChainError::revert(REVERT_RATING_RANGE));
        }

        let player = &mut state.players[player_id as usize];
        player.score += U256::from(rating);
        player.ballots += 1;
        state.voted.insert(from);
        Ok(state.mine(from))
    }

    fn vote_encrypted(
        &self,
        from: Address,
        player_id: u32,
        handle: B256,
        proof: &Bytes,
    ) -> ChainResult<TxReceipt> {
        let mut state = self.state.lock();
        state.enter(LocalMethod::VoteFor)?;

        if self.kind != ContractKind::Encrypted {
            return Err(ChainError::new(
                ErrorKind::CallException,
                "function selector was not recognized",
            ));
        }
        let current = B256::from(state.player(player_id)?.score.to_be_bytes::<32>());
        if state.voted.contains(&from) {
            return Err(ChainError::revert(REVERT_ALREADY_VOTED));
        }

        self.coprocessor
            .verify_input(handle, proof, self.contract, from)?;
        let total = self.coprocessor.add(current, handle)?;
        for account in [self.contract, self.admin, from] {
            self.coprocessor.allow(total, account)?;
        }

        let player = &mut state.players[player_id as usize];
        player.score = U256::from_be_bytes(total.0);
        player.ballots += 1;
        state.voted.insert(from);
        Ok(state.mine(from))
    }

    fn grant_decrypt(&self, from: Address, player_id: u32) -> ChainResult<TxReceipt> {
        let mut state = self.state.lock();
        state.enter(LocalMethod::AllowAdminToDecrypt)?;

        let score = state.player(player_id)?.score;
        if self.kind == ContractKind::Encrypted {
            self.coprocessor
                .allow(B256::from(score.to_be_bytes::<32>()), self.admin)?;
        }
        state.players[player_id as usize].last_requester = Some(from);
        Ok(state.mine(from))
    }
}

#[async_trait]
impl Eip1193Provider for LocalChain {
    async fn request(&self, method: &str, _params: Vec<Value>) -> ChainResult<Value> {
        match method {
            "eth_chainId" => Ok(format_quantity(self.chain_id)),
            "eth_accounts" | "eth_requestAccounts" => {
                serde_json::to_value(&self.accounts)
                    .map_err(|e| ChainError::malformed(e.to_string()))
            }
            "eth_blockNumber" => Ok(format_quantity(self.state.lock().block_number)),
            other => Err(ChainError::new(
                ErrorKind::Unknown,
                format!("method {other} not supported by the local chain"),
            )),
        }
    }
}

#[async_trait]
impl VotingReader for LocalChain {
    async fn list_players(&self, contract: Address) -> ChainResult<PlayerTable> {
        self.check_contract(contract)?;
        let mut state = self.state.lock();
        state.enter(LocalMethod::ListPlayers)?;

        Ok(PlayerTable {
            names: state.players.iter().map(|p| p.name.clone()).collect(),
            scores: state.players.iter().map(|p| p.score).collect(),
            ballots: state.players.iter().map(|p| p.ballots).collect(),
        })
    }

    async fn get_player(&self, contract: Address, player_id: u32) -> ChainResult<PlayerRecord> {
        self.check_contract(contract)?;
        let mut state = self.state.lock();
        state.enter(LocalMethod::GetPlayer)?;

        let player = state.player(player_id)?;
        Ok(PlayerRecord {
            name: player.name.clone(),
            score: player.score,
            ballots: player.ballots,
        })
    }

    async fn total_players(&self, contract: Address) -> ChainResult<u64> {
        self.check_contract(contract)?;
        Ok(self.state.lock().players.len() as u64)
    }

    async fn admin(&self, contract: Address) -> ChainResult<Address> {
        self.check_contract(contract)?;
        Ok(self.admin)
    }
}

/// Transaction already mined by the local chain
#[derive(Debug)]
pub struct LocalPendingTx {
    receipt: TxReceipt,
}

#[async_trait]
impl PendingTransaction for LocalPendingTx {
    fn hash(&self) -> TxHash {
        self.receipt.transaction_hash
    }

    async fn wait(self: Box<Self>) -> ChainResult<TxReceipt> {
        Ok(self.receipt)
    }
}

/// Signs for one development account
#[derive(Debug, Clone)]
pub struct LocalSigner {
    chain: Arc<LocalChain>,
    address: Address,
}

impl LocalSigner {
    fn submit(&self, receipt: ChainResult<TxReceipt>) -> ChainResult<Box<dyn PendingTransaction>> {
        let receipt = receipt?;
        debug!(
            "Local tx {} from {} mined in block {:?}",
            receipt.transaction_hash, self.address, receipt.block_number
        );
        Ok(Box::new(LocalPendingTx { receipt }))
    }
}

#[async_trait]
impl VotingSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn vote_for(
        &self,
        contract: Address,
        player_id: u32,
        rating: u8,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.chain.check_contract(contract)?;
        let receipt = self.chain.vote_clear(self.address, player_id, rating);
        self.submit(receipt)
    }

    async fn vote_for_encrypted(
        &self,
        contract: Address,
        player_id: u32,
        handle: B256,
        input_proof: &Bytes,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.chain.check_contract(contract)?;
        let receipt = self
            .chain
            .vote_encrypted(self.address, player_id, handle, input_proof);
        self.submit(receipt)
    }

    async fn allow_admin_to_decrypt(
        &self,
        contract: Address,
        player_id: u32,
    ) -> ChainResult<Box<dyn PendingTransaction>> {
        self.chain.check_contract(contract)?;
        let receipt = self.chain.grant_decrypt(self.address, player_id);
        self.submit(receipt)
    }
}

/// Wallet backend whose accounts are the local development accounts
#[derive(Debug, Clone)]
pub struct LocalWalletBackend {
    chain: Arc<LocalChain>,
}

impl LocalWalletBackend {
    pub fn new(chain: Arc<LocalChain>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl WalletBackend for LocalWalletBackend {
    fn public_client(&self, chain_id: Option<u64>) -> Option<Arc<dyn VotingReader>> {
        match chain_id {
            Some(id) if id != self.chain.chain_id => None,
            _ => Some(self.chain.clone()),
        }
    }

    async fn signer(
        &self,
        provider: Arc<dyn Eip1193Provider>,
        address: Address,
        chain_id: u64,
    ) -> ChainResult<Arc<dyn VotingSigner>> {
        if chain_id != self.chain.chain_id {
            return Err(ChainError::transport(format!(
                "local wallet cannot sign on chain {chain_id}"
            )));
        }
        let accounts = provider_accounts(provider.as_ref()).await?;
        if !accounts.contains(&address) {
            return Err(ChainError::new(
                ErrorKind::Unknown,
                format!("account {address} is not managed by this wallet"),
            ));
        }
        Ok(Arc::new(self.chain.signer(address)))
    }
}
