//! Voting Flow Integration Tests
//!
//! Drive the orchestrator end to end against the in-memory chain: wallet
//! session, contract resolution, ballots and the decrypt-and-reveal flow.

use std::sync::Arc;
use std::time::Duration;

use votechain::client::local::{Fault, LocalChain, LocalMethod, LocalWalletBackend, DEV_ACCOUNTS};
use votechain::client::notify::{MemoryNotifier, NoticeLevel};
use votechain::client::orchestrator::{OrchestratorBuilder, OrchestratorConfig, VotingOrchestrator};
use votechain::client::progress::{progress_channel, DecryptProgress};
use votechain::client::session::{WalletAdapter, WalletEvent};
use votechain::client::{AddressBook, ContractKind, ContractResolver, ErrorKind};

struct Stack {
    chain: Arc<LocalChain>,
    wallet: WalletAdapter,
    notifier: Arc<MemoryNotifier>,
    orchestrator: Arc<VotingOrchestrator>,
}

impl Stack {
    fn new(chain: LocalChain, config: OrchestratorConfig) -> Self {
        let resolver = ContractResolver::new(chain.kind());
        Self::with_resolver(chain, config, resolver)
    }

    fn with_resolver(
        chain: LocalChain,
        config: OrchestratorConfig,
        resolver: ContractResolver,
    ) -> Self {
        let chain = Arc::new(chain);
        let wallet = WalletAdapter::new(Arc::new(LocalWalletBackend::new(chain.clone())));
        let notifier = Arc::new(MemoryNotifier::new());
        let orchestrator = Arc::new(VotingOrchestrator::new(
            config,
            resolver,
            wallet.subscribe(),
            Arc::new(chain.runtime_factory()),
            notifier.clone(),
        ));
        Self {
            chain,
            wallet,
            notifier,
            orchestrator,
        }
    }

    /// Apply a wallet event, then settle the runtime and reload the roster
    async fn apply(&self, event: WalletEvent) {
        self.wallet.apply(event).await;
        if let Some(task) = self.orchestrator.sync_session() {
            task.await.unwrap();
        }
        self.orchestrator.refresh_players().await;
    }

    async fn decrypt(&self, player_id: u32) -> Vec<DecryptProgress> {
        let (tx, mut rx) = progress_channel();
        self.orchestrator.decrypt_locally(player_id, Some(tx)).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}

fn immediate() -> OrchestratorConfig {
    OrchestratorBuilder::new().immediate().build()
}

#[tokio::test]
async fn vote_then_reveal_single_player() {
    let stack = Stack::new(LocalChain::new(ContractKind::Simple, &["A"]), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;

    let roster = stack.orchestrator.players();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "A");
    assert_eq!(roster[0].ballots, 0);

    assert!(stack.orchestrator.vote_for_player(0, Some(7)).await);
    assert_eq!(stack.orchestrator.players()[0].ballots, 1);

    let events = stack.decrypt(0).await;
    assert!(matches!(
        events.as_slice(),
        [
            DecryptProgress::Started,
            DecryptProgress::SendingTransaction,
            DecryptProgress::AwaitingConfirmation { .. },
            DecryptProgress::Confirmed,
            DecryptProgress::FetchingData,
            DecryptProgress::DataRetrieved,
            DecryptProgress::Completed { clear: 7 },
        ]
    ));

    let player = stack.orchestrator.player(0).unwrap();
    assert_eq!(player.last_clear, Some(7));
    assert_eq!(player.last_requester, Some(DEV_ACCOUNTS[1]));
    assert!(!stack.orchestrator.is_decrypting());
}

#[tokio::test]
async fn encrypted_tally_across_two_voters() {
    let stack = Stack::new(LocalChain::encrypted(), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    assert!(stack.orchestrator.runtime().instance().is_some());

    assert!(stack.orchestrator.vote_for_player(1, Some(7)).await);

    stack
        .apply(WalletEvent::AccountChanged {
            address: DEV_ACCOUNTS[2],
        })
        .await;
    assert!(stack.orchestrator.vote_for_player(1, Some(4)).await);

    let player = stack.orchestrator.player(1).unwrap();
    assert_eq!(player.ballots, 2);
    assert!(player.handle.starts_with("0x"));
    assert_eq!(player.last_clear, None);

    let events = stack.decrypt(1).await;
    assert_eq!(events.last(), Some(&DecryptProgress::Completed { clear: 11 }));
    assert_eq!(stack.chain.last_requester(1), Some(DEV_ACCOUNTS[2]));
}

#[tokio::test]
async fn repeat_voter_is_rejected() {
    let stack = Stack::new(LocalChain::simple(), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[2])).await;

    assert!(stack.orchestrator.vote_for_player(2, Some(3)).await);
    let roster = stack.orchestrator.players();

    assert!(!stack.orchestrator.vote_for_player(0, Some(3)).await);
    assert_eq!(stack.orchestrator.players(), roster);
    assert!(stack.notifier.contains(NoticeLevel::Error, "already voted"));
}

#[tokio::test]
async fn rejected_grant_never_reads() {
    let stack = Stack::new(LocalChain::simple(), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    stack
        .chain
        .inject_fault(LocalMethod::AllowAdminToDecrypt, Fault::UserRejected);
    let reads = stack.chain.call_count(LocalMethod::GetPlayer);

    let events = stack.decrypt(0).await;
    assert_eq!(events.last(), Some(&DecryptProgress::Cancelled));
    assert!(!events.contains(&DecryptProgress::FetchingData));
    assert_eq!(stack.chain.call_count(LocalMethod::GetPlayer), reads);
    assert!(!stack.orchestrator.is_decrypting());
}

#[tokio::test]
async fn failed_grant_falls_back_to_direct_read() {
    let stack = Stack::new(LocalChain::simple(), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    assert!(stack.orchestrator.vote_for_player(2, Some(5)).await);
    stack
        .chain
        .inject_fault(LocalMethod::AllowAdminToDecrypt, Fault::Transport);

    let events = stack.decrypt(2).await;
    assert!(events.contains(&DecryptProgress::FallingBack));
    assert_eq!(events.last(), Some(&DecryptProgress::Completed { clear: 5 }));

    let player = stack.orchestrator.player(2).unwrap();
    assert_eq!(player.last_clear, Some(5));
    assert_eq!(player.last_requester, None);
    assert!(stack.notifier.contains(NoticeLevel::Warning, "proceeding with direct access"));
}

#[tokio::test]
async fn strict_policy_surfaces_grant_failure() {
    let config = OrchestratorBuilder::new()
        .immediate()
        .fallback_on_grant_failure(false)
        .build();
    let stack = Stack::new(LocalChain::simple(), config);
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    stack
        .chain
        .inject_fault(LocalMethod::AllowAdminToDecrypt, Fault::RelayerDown);

    let events = stack.decrypt(0).await;
    assert_eq!(
        events.last(),
        Some(&DecryptProgress::Failed {
            kind: Some(ErrorKind::RelayerUnavailable)
        })
    );
    assert_eq!(stack.orchestrator.player(0).unwrap().last_clear, Some(0));
}

#[tokio::test]
async fn unknown_player_is_a_no_op() {
    let stack = Stack::new(LocalChain::simple(), immediate());
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    let grants = stack.chain.call_count(LocalMethod::AllowAdminToDecrypt);

    let events = stack.decrypt(42).await;
    assert_eq!(events, vec![DecryptProgress::Failed { kind: None }]);
    assert_eq!(stack.chain.call_count(LocalMethod::AllowAdminToDecrypt), grants);
    assert!(stack.notifier.contains(NoticeLevel::Info, "Player not found."));
    assert!(!stack.orchestrator.is_decrypting());
}

#[tokio::test]
async fn chain_mismatch_blocks_writes() {
    let chain = LocalChain::simple();
    // deployment row for the local chain id that claims another network
    let book = AddressBook::from_json(&format!(
        r#"{{"31337":{{"address":"{}","chainId":11155111,"chainName":"sepolia"}}}}"#,
        chain.contract_address()
    ))
    .unwrap();
    let resolver = ContractResolver::new(ContractKind::Simple).with_address_book(book);
    let stack = Stack::with_resolver(chain, immediate(), resolver);
    stack.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    assert_eq!(stack.orchestrator.contract_info().chain_id, Some(11_155_111));

    assert!(!stack.orchestrator.vote_for_player(1, Some(5)).await);
    assert!(stack.notifier.contains(NoticeLevel::Error, "Network mismatch"));
    assert!(!stack.orchestrator.is_casting());

    let events = stack.decrypt(1).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], DecryptProgress::Failed { .. }));
    assert!(!stack.orchestrator.is_decrypting());

    assert_eq!(stack.chain.call_count(LocalMethod::VoteFor), 0);
    assert_eq!(stack.chain.call_count(LocalMethod::AllowAdminToDecrypt), 0);
}

#[tokio::test]
async fn watcher_follows_wallet_lifecycle() {
    let stack = Stack::new(LocalChain::simple(), immediate());
    let watcher = stack.orchestrator.spawn_session_watcher();

    stack.wallet.apply(stack.chain.connect(DEV_ACCOUNTS[1])).await;
    wait_until(|| stack.orchestrator.players().len() == 3).await;
    assert!(stack.orchestrator.contract_info().is_deployed());

    // no deployment on the other chain: roster clears, actions disabled
    stack
        .wallet
        .apply(WalletEvent::ChainChanged { chain_id: 5 })
        .await;
    wait_until(|| stack.orchestrator.players().is_empty()).await;
    assert!(!stack.orchestrator.contract_info().is_deployed());
    assert!(!stack.orchestrator.vote_for_player(0, Some(3)).await);

    drop(stack);
    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .unwrap()
        .unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
