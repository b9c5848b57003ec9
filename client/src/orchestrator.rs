//! Voting Orchestrator
//!
//! Coordinates the session adapter, contract resolver and encryption runtime
//! bridge, and exposes the three user operations:
//!
//! - [`VotingOrchestrator::refresh_players`] replaces the roster wholesale
//! - [`VotingOrchestrator::vote_for_player`] casts one ballot
//! - [`VotingOrchestrator::decrypt_locally`] grants access, reads and reveals one score
//!
//! No operation returns an error. Failures become a status message plus a
//! notice; busy flags are held by guards and released on every exit path.

use crate::chain::{TxReceipt, VotingReader, VotingSigner};
use crate::contract::{ContractInfo, ContractKind, ContractResolver};
use crate::errors::{ChainError, ChainResult, ErrorKind, VotingError, VotingResult};
use crate::networks::{network_label, LOCAL_CHAIN_ID, LOCAL_RPC_URL};
use crate::notify::{Notice, Notifier};
use crate::progress::{DecryptProgress, ProgressReporter, ProgressSender};
use crate::roster::{snapshots_from_table, unix_now, PlayerSnapshot};
use crate::runtime::{create_encrypted_input, RuntimeBridge, RuntimeFactory};
use crate::session::SessionState;
use alloy_primitives::Address;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Rating used when the caller does not pick one
pub const DEFAULT_RATING: u8 = 1;

/// Ratings accepted by the clear-text contract
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=11;

/// Notice id shared by the grant-transaction notices
const DECRYPT_NOTICE_ID: &str = "decrypt-request";

/// What to do when the access-grant transaction fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptPolicy {
    /// Continue with a direct read after a failure other than user rejection
    pub fallback_on_grant_failure: bool,
}

impl Default for DecryptPolicy {
    fn default() -> Self {
        Self {
            fallback_on_grant_failure: true,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause before reading revealed data
    pub fetch_delay: Duration,
    /// How long a success message stays before it is cleared
    pub status_linger: Duration,
    /// Grant failure handling
    pub decrypt_policy: DecryptPolicy,
    /// Chains served by a mock encryption runtime
    pub mock_chains: HashMap<u64, String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fetch_delay: Duration::from_secs(1),
            status_linger: Duration::from_secs(2),
            decrypt_policy: DecryptPolicy::default(),
            mock_chains: HashMap::from([(LOCAL_CHAIN_ID, LOCAL_RPC_URL.to_string())]),
        }
    }
}

/// Builder for orchestrator configuration
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_delay(mut self, delay: Duration) -> Self {
        self.config.fetch_delay = delay;
        self
    }

    pub fn status_linger(mut self, linger: Duration) -> Self {
        self.config.status_linger = linger;
        self
    }

    pub fn fallback_on_grant_failure(mut self, enabled: bool) -> Self {
        self.config.decrypt_policy.fallback_on_grant_failure = enabled;
        self
    }

    /// Serve `chain_id` with a mock runtime
    pub fn mock_chain(mut self, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        self.config.mock_chains.insert(chain_id, rpc_url.into());
        self
    }

    /// No UX delays (tests, scripted runs)
    pub fn immediate(self) -> Self {
        self.fetch_delay(Duration::ZERO).status_linger(Duration::ZERO)
    }

    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// Counts in-flight operations of one kind
#[derive(Debug, Default)]
struct BusyFlag(AtomicUsize);

impl BusyFlag {
    fn acquire(&self) -> BusyGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        BusyGuard(self)
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

struct BusyGuard<'a>(&'a BusyFlag);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0 .0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct ViewState {
    contract: ContractInfo,
    players: Vec<PlayerSnapshot>,
    status_message: Option<String>,
    /// Bumped on every status change
    status_epoch: u64,
}

impl ViewState {
    fn set_status(&mut self, message: Option<String>) {
        self.status_message = message;
        self.status_epoch += 1;
    }
}

/// Everything a write operation needs, captured after the preflight checks
struct CallContext {
    contract: Address,
    signer: Arc<dyn VotingSigner>,
    reader: Option<Arc<dyn VotingReader>>,
}

/// Read-only view for a front end
#[derive(Debug, Clone)]
pub struct VotingView {
    pub players: Vec<PlayerSnapshot>,
    pub is_loading: bool,
    pub is_casting: bool,
    pub is_decrypting: bool,
    pub status_message: Option<String>,
    pub contract: ContractInfo,
}

/// The voting state machine
pub struct VotingOrchestrator {
    config: OrchestratorConfig,
    resolver: ContractResolver,
    session: watch::Receiver<SessionState>,
    runtime: RuntimeBridge,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<ViewState>>,
    loading: BusyFlag,
    casting: BusyFlag,
    decrypting: BusyFlag,
}

impl VotingOrchestrator {
    /// The encryption runtime is only used by the encrypted flavour
    pub fn new(
        config: OrchestratorConfig,
        resolver: ContractResolver,
        session: watch::Receiver<SessionState>,
        factory: Arc<dyn RuntimeFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let kind = resolver.kind();
        let runtime = RuntimeBridge::new(factory, config.mock_chains.clone(), kind.is_encrypted());
        let contract = resolver.resolve(session.borrow().chain_id);

        Self {
            config,
            resolver,
            session,
            runtime,
            notifier,
            state: Arc::new(Mutex::new(ViewState {
                contract,
                players: Vec::new(),
                status_message: None,
                status_epoch: 0,
            })),
            loading: BusyFlag::default(),
            casting: BusyFlag::default(),
            decrypting: BusyFlag::default(),
        }
    }

    pub fn kind(&self) -> ContractKind {
        self.resolver.kind()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn runtime(&self) -> &RuntimeBridge {
        &self.runtime
    }

    pub fn players(&self) -> Vec<PlayerSnapshot> {
        self.state.lock().players.clone()
    }

    pub fn player(&self, player_id: u32) -> Option<PlayerSnapshot> {
        self.state
            .lock()
            .players
            .iter()
            .find(|p| p.id == player_id)
            .cloned()
    }

    pub fn contract_info(&self) -> ContractInfo {
        self.state.lock().contract.clone()
    }

    pub fn status_message(&self) -> Option<String> {
        self.state.lock().status_message.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    pub fn is_casting(&self) -> bool {
        self.casting.is_set()
    }

    pub fn is_decrypting(&self) -> bool {
        self.decrypting.is_set()
    }

    pub fn view(&self) -> VotingView {
        let state = self.state.lock();
        VotingView {
            players: state.players.clone(),
            is_loading: self.is_loading(),
            is_casting: self.is_casting(),
            is_decrypting: self.is_decrypting(),
            status_message: state.status_message.clone(),
            contract: state.contract.clone(),
        }
    }

    /// Pick up the latest session: re-resolve the contract and point the
    /// runtime bridge at the current provider and chain.
    ///
    /// Must run inside a Tokio runtime; returns the runtime construction
    /// task when one was started.
    pub fn sync_session(&self) -> Option<JoinHandle<()>> {
        let session = self.session.borrow().clone();
        let contract = self.resolver.resolve(session.chain_id);
        {
            let mut state = self.state.lock();
            if state.contract != contract {
                debug!(
                    "Contract info changed: {:?} on chain {:?}",
                    contract.address, contract.chain_id
                );
                state.contract = contract;
            }
        }
        self.runtime.update(session.provider, session.chain_id)
    }

    /// Follow session changes in the background, refreshing the roster
    /// after each one. Stops when the session channel closes or the
    /// orchestrator is dropped.
    pub fn spawn_session_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let mut rx = self.session.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(this) = weak.upgrade() else {
                    break;
                };
                this.sync_session();
                this.refresh_players().await;
            }
            debug!("Session watcher stopped");
        })
    }

    fn session(&self) -> (ContractInfo, SessionState) {
        self.sync_session();
        let session = self.session.borrow().clone();
        (self.contract_info(), session)
    }

    /// Network match first, then signer, then deployment
    fn preflight(&self) -> VotingResult<CallContext> {
        let (contract, session) = self.session();

        if let (Some(expected), Some(actual)) = (contract.chain_id, session.chain_id) {
            if expected != actual {
                return Err(VotingError::NetworkMismatch {
                    contract: network_label(expected).to_string(),
                    wallet: network_label(actual).to_string(),
                });
            }
        }

        let signer = session.signer.ok_or(VotingError::WalletNotConnected)?;
        let address = contract
            .address
            .ok_or(VotingError::ContractNotDeployed(contract.chain_id))?;

        Ok(CallContext {
            contract: address,
            signer,
            reader: session.read_client,
        })
    }

    fn set_status(&self, message: impl Into<String>) {
        self.state.lock().set_status(Some(message.into()));
    }

    fn clear_status(&self) {
        self.state.lock().set_status(None);
    }

    /// Clear the status after the linger time unless it changed meanwhile
    fn linger_status(&self) {
        let epoch = self.state.lock().status_epoch;
        let state = self.state.clone();
        let linger = self.config.status_linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            let mut state = state.lock();
            if state.status_epoch == epoch {
                state.set_status(None);
            }
        });
    }

    fn report_failure(&self, err: &VotingError, fallback: &str) {
        warn!("{}", err);
        self.notifier.notify(Notice::error(err.user_message(fallback)));
    }

    /// Reload the roster from the contract
    pub async fn refresh_players(&self) {
        let (contract, session) = self.session();
        let (Some(address), Some(reader)) = (contract.address, session.read_client) else {
            debug!("No contract or read client; clearing roster");
            self.state.lock().players.clear();
            return;
        };

        let _busy = self.loading.acquire();
        match reader.list_players(address).await {
            Ok(table) => {
                let players = snapshots_from_table(self.kind(), &table);
                debug!("Loaded {} players from {}", players.len(), address);
                self.state.lock().players = players;
            }
            Err(e) => {
                warn!("Failed to load players: {}", e);
                self.notifier
                    .notify(Notice::error("Unable to load player data from the contract."));
            }
        }
    }

    /// Cast a ballot; `true` only when the transaction was mined
    pub async fn vote_for_player(&self, player_id: u32, rating: Option<u8>) -> bool {
        let rating = rating.unwrap_or(DEFAULT_RATING);
        let fallback = match self.kind() {
            ContractKind::Simple => "Failed to submit vote. Please try again.",
            ContractKind::Encrypted => "Failed to submit encrypted vote. Please try again.",
        };

        let ctx = match self.preflight() {
            Ok(ctx) => ctx,
            Err(e) => {
                self.report_failure(&e, fallback);
                return false;
            }
        };

        let _busy = self.casting.acquire();
        self.set_status(match self.kind() {
            ContractKind::Simple => "Submitting vote...",
            ContractKind::Encrypted => "Preparing encrypted vote...",
        });

        let voted = match self.submit_vote(&ctx, player_id, rating).await {
            Ok(receipt) => {
                info!(
                    "Vote for player {} mined in block {:?}",
                    player_id, receipt.block_number
                );
                self.notifier.notify(Notice::success(match self.kind() {
                    ContractKind::Simple => "Vote submitted successfully!",
                    ContractKind::Encrypted => "Encrypted vote submitted successfully!",
                }));
                self.refresh_players().await;
                true
            }
            Err(e) => {
                self.report_failure(&e, fallback);
                false
            }
        };

        self.clear_status();
        voted
    }

    async fn submit_vote(
        &self,
        ctx: &CallContext,
        player_id: u32,
        rating: u8,
    ) -> VotingResult<TxReceipt> {
        let pending = match self.kind() {
            ContractKind::Simple => ctx.signer.vote_for(ctx.contract, player_id, rating).await?,
            ContractKind::Encrypted => {
                let runtime = self.runtime.instance().ok_or(VotingError::RuntimeNotReady)?;
                let input = create_encrypted_input(&runtime, ctx.contract, ctx.signer.address())
                    .add32(u32::from(rating))
                    .encrypt()
                    .await?;
                let handle = input
                    .handles
                    .first()
                    .copied()
                    .ok_or_else(|| ChainError::malformed("encrypted input carried no handle"))?;

                self.set_status("Submitting encrypted vote to blockchain...");
                ctx.signer
                    .vote_for_encrypted(ctx.contract, player_id, handle, &input.input_proof)
                    .await?
            }
        };

        debug!("Vote transaction {} submitted", pending.hash());
        Ok(pending.wait().await?)
    }

    /// Grant decrypt access, read the player's score and reveal it
    ///
    /// Progress events go to `progress`; each run ends with exactly one
    /// terminal event.
    pub async fn decrypt_locally(&self, player_id: u32, progress: Option<ProgressSender>) {
        let progress = ProgressReporter::new(progress);
        let fallback = match self.kind() {
            ContractKind::Simple => "Failed to fetch vote data.",
            ContractKind::Encrypted => {
                "FHE decryption failed. Make sure you have permission to decrypt this data."
            }
        };

        let ctx = match self.preflight() {
            Ok(ctx) => ctx,
            Err(e) => {
                self.report_failure(&e, fallback);
                progress.emit(DecryptProgress::Failed { kind: e.kind() });
                return;
            }
        };

        let Some(player) = self.player(player_id) else {
            self.notifier.notify(Notice::info("Player not found."));
            progress.emit(DecryptProgress::Failed { kind: None });
            return;
        };

        let _busy = self.decrypting.acquire();
        self.set_status(match self.kind() {
            ContractKind::Simple => "Fetching vote data...",
            ContractKind::Encrypted => "Initializing FHE decryption...",
        });

        match self.run_decrypt(&ctx, &player, &progress).await {
            Ok(Some(_)) => self.linger_status(),
            Ok(None) => {}
            Err(e) => {
                self.report_failure(&e, fallback);
                self.set_status("Operation failed");
                progress.emit(DecryptProgress::Failed { kind: e.kind() });
            }
        }
    }

    /// `Ok(None)` when the user declined the grant
    async fn run_decrypt(
        &self,
        ctx: &CallContext,
        player: &PlayerSnapshot,
        progress: &ProgressReporter,
    ) -> VotingResult<Option<u64>> {
        let runtime = match self.kind() {
            ContractKind::Simple => None,
            ContractKind::Encrypted => {
                Some(self.runtime.instance().ok_or(VotingError::RuntimeNotReady)?)
            }
        };

        progress.emit(DecryptProgress::Started);
        self.set_status("Requesting decryption access...");
        self.notifier.notify(
            Notice::info("Initiating decryption request...")
                .with_description("Preparing to access encrypted vote data"),
        );

        progress.emit(DecryptProgress::SendingTransaction);
        self.notifier.notify(
            Notice::loading("Sending transaction to wallet...")
                .with_id(DECRYPT_NOTICE_ID)
                .with_description("Please confirm in your wallet"),
        );
        self.set_status("Sending transaction to wallet...");

        let granted = match self.grant_access(ctx, player.id, progress).await {
            Ok(_) => true,
            Err(e) if e.kind == ErrorKind::UserRejected => {
                info!("User cancelled the decrypt grant for player {}", player.id);
                self.notifier.notify(
                    Notice::error("Transaction cancelled")
                        .with_id(DECRYPT_NOTICE_ID)
                        .with_description("You cancelled the transaction in your wallet"),
                );
                progress.emit(DecryptProgress::Cancelled);
                self.set_status("Transaction cancelled");
                return Ok(None);
            }
            Err(e) if self.config.decrypt_policy.fallback_on_grant_failure => {
                warn!("Decrypt grant failed, reading directly: {}", e);
                self.notifier.notify(
                    Notice::warning("Transaction failed, proceeding with direct access")
                        .with_id(DECRYPT_NOTICE_ID)
                        .with_description("Using read-only data access"),
                );
                self.set_status("Proceeding with direct data access...");
                progress.emit(DecryptProgress::FallingBack);
                false
            }
            Err(e) => return Err(e.into()),
        };

        progress.emit(DecryptProgress::FetchingData);
        self.set_status("Fetching decrypted vote data...");
        if !self.config.fetch_delay.is_zero() {
            tokio::time::sleep(self.config.fetch_delay).await;
        }

        let reader = ctx.reader.clone().ok_or(VotingError::WalletNotConnected)?;
        let record = reader.get_player(ctx.contract, player.id).await?;
        progress.emit(DecryptProgress::DataRetrieved);

        let clear = match runtime {
            None => u64::try_from(record.score)
                .map_err(|_| ChainError::malformed("score does not fit in 64 bits"))?,
            Some(runtime) => {
                runtime
                    .user_decrypt(record.handle(), ctx.contract, ctx.signer.address())
                    .await?
            }
        };
        debug!("Revealed player {}: {}", player.id, clear);

        {
            let mut state = self.state.lock();
            let now = unix_now();
            for snapshot in state.players.iter_mut().filter(|p| p.id == player.id) {
                snapshot.reveal(clear, now);
                if granted {
                    snapshot.last_requester = Some(ctx.signer.address());
                }
            }
        }

        self.notifier.notify(
            Notice::success("Vote data successfully decrypted!").with_description(format!(
                "{}: {} points ({} votes)",
                player.name, clear, record.ballots
            )),
        );
        self.set_status("Decryption completed successfully");
        progress.emit(DecryptProgress::Completed { clear });
        Ok(Some(clear))
    }

    async fn grant_access(
        &self,
        ctx: &CallContext,
        player_id: u32,
        progress: &ProgressReporter,
    ) -> ChainResult<TxReceipt> {
        let pending = ctx
            .signer
            .allow_admin_to_decrypt(ctx.contract, player_id)
            .await?;
        let tx_hash = pending.hash();
        debug!("Decrypt grant {} submitted", tx_hash);

        progress.emit(DecryptProgress::AwaitingConfirmation { tx_hash });
        let short_hash = tx_hash.to_string();
        self.notifier.notify(
            Notice::loading("Waiting for transaction confirmation...")
                .with_id(DECRYPT_NOTICE_ID)
                .with_description(format!("Transaction: {}...", &short_hash[..10])),
        );
        self.set_status("Waiting for transaction confirmation...");

        let receipt = pending.wait().await?;

        self.notifier.notify(
            Notice::success("Transaction confirmed!")
                .with_id(DECRYPT_NOTICE_ID)
                .with_description("Decryption access granted on blockchain"),
        );
        self.set_status("Transaction confirmed!");
        progress.emit(DecryptProgress::Confirmed);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{Fault, LocalChain, LocalMethod, LocalWalletBackend, DEV_ACCOUNTS};
    use crate::notify::{MemoryNotifier, NoticeLevel};
    use crate::progress::progress_channel;
    use crate::runtime::RuntimeStatus;
    use crate::session::WalletAdapter;

    struct Harness {
        chain: Arc<LocalChain>,
        wallet: WalletAdapter,
        notifier: Arc<MemoryNotifier>,
        orchestrator: VotingOrchestrator,
    }

    async fn harness(chain: LocalChain, config: OrchestratorConfig) -> Harness {
        let chain = Arc::new(chain);
        let wallet = WalletAdapter::new(Arc::new(LocalWalletBackend::new(chain.clone())));
        wallet.apply(chain.connect(DEV_ACCOUNTS[1])).await;

        let notifier = Arc::new(MemoryNotifier::new());
        let orchestrator = VotingOrchestrator::new(
            config,
            ContractResolver::new(chain.kind()),
            wallet.subscribe(),
            Arc::new(chain.runtime_factory()),
            notifier.clone(),
        );
        if let Some(task) = orchestrator.sync_session() {
            task.await.unwrap();
        }
        orchestrator.refresh_players().await;

        Harness {
            chain,
            wallet,
            notifier,
            orchestrator,
        }
    }

    fn fast() -> OrchestratorConfig {
        OrchestratorBuilder::new().immediate().build()
    }

    #[test]
    fn test_builder_defaults() {
        let config = OrchestratorBuilder::new().build();
        assert_eq!(config.fetch_delay, Duration::from_secs(1));
        assert_eq!(config.status_linger, Duration::from_secs(2));
        assert!(config.decrypt_policy.fallback_on_grant_failure);
        assert_eq!(
            config.mock_chains.get(&LOCAL_CHAIN_ID).map(String::as_str),
            Some(LOCAL_RPC_URL)
        );

        let config = OrchestratorBuilder::new()
            .fallback_on_grant_failure(false)
            .mock_chain(1337, "http://localhost:8546")
            .build();
        assert!(!config.decrypt_policy.fallback_on_grant_failure);
        assert_eq!(config.mock_chains.len(), 2);
    }

    #[test]
    fn test_busy_flag_counts_nested_guards() {
        let flag = BusyFlag::default();
        let first = flag.acquire();
        let second = flag.acquire();
        drop(first);
        assert!(flag.is_set());
        drop(second);
        assert!(!flag.is_set());
    }

    #[tokio::test]
    async fn test_refresh_loads_roster() {
        let h = harness(LocalChain::simple(), fast()).await;
        let players = h.orchestrator.players();
        assert_eq!(players.len(), 3);
        assert_eq!(players[1].name, "Midnight Playmaker");
        assert_eq!(players[1].handle, "score_0");
        assert!(!h.orchestrator.is_loading());
    }

    #[tokio::test]
    async fn test_vote_refreshes_once() {
        let h = harness(LocalChain::simple(), fast()).await;
        let before = h.chain.call_count(LocalMethod::ListPlayers);

        assert!(h.orchestrator.vote_for_player(0, Some(7)).await);
        assert_eq!(h.chain.call_count(LocalMethod::ListPlayers), before + 1);
        assert_eq!(h.orchestrator.players()[0].ballots, 1);
        assert!(!h.orchestrator.is_casting());
        assert!(h.orchestrator.status_message().is_none());
        assert!(h.notifier.contains(NoticeLevel::Success, "Vote submitted"));
    }

    #[tokio::test]
    async fn test_second_vote_fails_without_touching_roster() {
        let h = harness(LocalChain::simple(), fast()).await;
        assert!(h.orchestrator.vote_for_player(0, None).await);
        let roster = h.orchestrator.players();

        assert!(!h.orchestrator.vote_for_player(2, Some(4)).await);
        assert_eq!(h.orchestrator.players(), roster);
        assert!(h.notifier.contains(NoticeLevel::Error, "already voted"));
    }

    #[tokio::test]
    async fn test_vote_rating_out_of_range() {
        let h = harness(LocalChain::simple(), fast()).await;
        assert!(!h.orchestrator.vote_for_player(0, Some(0)).await);
        assert!(h
            .notifier
            .contains(NoticeLevel::Error, "Rating must be between 1 and 11"));
    }

    #[tokio::test]
    async fn test_vote_without_signer() {
        let h = harness(LocalChain::simple(), fast()).await;
        h.wallet.apply(crate::session::WalletEvent::Disconnected).await;

        assert!(!h.orchestrator.vote_for_player(0, None).await);
        assert!(h.notifier.contains(NoticeLevel::Error, "Wallet not connected"));
        assert_eq!(h.chain.call_count(LocalMethod::VoteFor), 0);
        // no chain id: no contract, roster cleared on refresh
        h.orchestrator.refresh_players().await;
        assert!(h.orchestrator.players().is_empty());
    }

    #[tokio::test]
    async fn test_decrypt_missing_player_is_noop() {
        let h = harness(LocalChain::simple(), fast()).await;
        let (tx, mut rx) = progress_channel();

        h.orchestrator.decrypt_locally(42, Some(tx)).await;
        assert!(!h.orchestrator.is_decrypting());
        assert!(h.notifier.contains(NoticeLevel::Info, "Player not found"));
        assert_eq!(h.chain.call_count(LocalMethod::AllowAdminToDecrypt), 0);
        assert_eq!(rx.recv().await, Some(DecryptProgress::Failed { kind: None }));
    }

    #[tokio::test]
    async fn test_decrypt_rejection_stops_before_read() {
        let h = harness(LocalChain::simple(), fast()).await;
        h.chain
            .inject_fault(LocalMethod::AllowAdminToDecrypt, Fault::UserRejected);
        let (tx, mut rx) = progress_channel();

        h.orchestrator.decrypt_locally(0, Some(tx)).await;

        assert_eq!(h.chain.call_count(LocalMethod::GetPlayer), 0);
        assert!(!h.orchestrator.is_decrypting());
        assert_eq!(
            h.orchestrator.status_message().as_deref(),
            Some("Transaction cancelled")
        );

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.last(), Some(&DecryptProgress::Cancelled));
        assert!(!events.contains(&DecryptProgress::FetchingData));
    }

    #[tokio::test]
    async fn test_decrypt_falls_back_after_grant_failure() {
        let h = harness(LocalChain::simple(), fast()).await;
        assert!(h.orchestrator.vote_for_player(1, Some(9)).await);
        h.chain.inject_fault(
            LocalMethod::AllowAdminToDecrypt,
            Fault::Revert("Ownable: caller is not the owner".into()),
        );

        h.orchestrator.decrypt_locally(1, None).await;

        let player = h.orchestrator.player(1).unwrap();
        assert_eq!(player.last_clear, Some(9));
        assert!(player.last_updated.is_some());
        assert_eq!(player.last_requester, None);
        assert!(h.notifier.contains(NoticeLevel::Warning, "direct access"));
    }

    #[tokio::test]
    async fn test_decrypt_without_fallback_fails() {
        let config = OrchestratorBuilder::new()
            .immediate()
            .fallback_on_grant_failure(false)
            .build();
        let h = harness(LocalChain::simple(), config).await;
        h.chain
            .inject_fault(LocalMethod::AllowAdminToDecrypt, Fault::Transport);
        let (tx, mut rx) = progress_channel();

        h.orchestrator.decrypt_locally(0, Some(tx)).await;

        assert_eq!(h.chain.call_count(LocalMethod::GetPlayer), 0);
        assert_eq!(
            h.orchestrator.status_message().as_deref(),
            Some("Operation failed")
        );
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(DecryptProgress::Failed {
                kind: Some(ErrorKind::Transport)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_status_lingers_then_clears() {
        let h = harness(LocalChain::simple(), OrchestratorConfig::default()).await;

        h.orchestrator.decrypt_locally(0, None).await;
        assert_eq!(
            h.orchestrator.status_message().as_deref(),
            Some("Decryption completed successfully")
        );
        assert_eq!(h.chain.last_requester(0), Some(DEV_ACCOUNTS[1]));
        assert_eq!(h.orchestrator.player(0).unwrap().last_requester, Some(DEV_ACCOUNTS[1]));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(h.orchestrator.status_message().is_none());
    }

    #[tokio::test]
    async fn test_encrypted_vote_and_reveal() {
        let h = harness(LocalChain::encrypted(), fast()).await;
        assert_eq!(h.orchestrator.runtime().status(), RuntimeStatus::Ready);
        assert!(h.orchestrator.players()[0].handle.starts_with("0x"));

        assert!(h.orchestrator.vote_for_player(0, Some(7)).await);
        assert_eq!(h.orchestrator.players()[0].ballots, 1);

        h.orchestrator.decrypt_locally(0, None).await;
        assert_eq!(h.orchestrator.player(0).unwrap().last_clear, Some(7));
    }

    #[tokio::test]
    async fn test_encrypted_reveal_denied_without_access() {
        let h = harness(LocalChain::encrypted(), fast()).await;

        // player 1 has no ballots from this account
        h.orchestrator.decrypt_locally(1, None).await;
        assert_eq!(h.orchestrator.player(1).unwrap().last_clear, None);
        assert!(h.notifier.contains(NoticeLevel::Error, "permission to decrypt"));
    }

    #[tokio::test]
    async fn test_encrypted_vote_with_relayer_down() {
        let h = harness(LocalChain::encrypted(), fast()).await;
        h.chain.coprocessor().set_relayer_available(false);

        assert!(!h.orchestrator.vote_for_player(0, Some(3)).await);
        assert!(h.notifier.contains(NoticeLevel::Error, "relayer service"));
        assert!(!h.chain.has_voted(DEV_ACCOUNTS[1]));
    }
}
