//! Votechain Client
//!
//! Wallet-connected client for the player voting contracts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Front end (CLI)                         │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Voting Orchestrator                       │
//! │  refresh_players · vote_for_player · decrypt_locally        │
//! └──────┬──────────────────┬───────────────────────┬───────────┘
//!        │                  │                       │
//!        ▼                  ▼                       ▼
//! ┌─────────────┐   ┌───────────────┐   ┌──────────────────────┐
//! │   Wallet    │   │   Contract    │   │  Encryption Runtime  │
//! │   Session   │   │   Resolver    │   │  Bridge (cancellable)│
//! └──────┬──────┘   └───────────────┘   └──────────────────────┘
//!        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Chain seams: Eip1193Provider · VotingReader · VotingSigner │
//! │   (JSON-RPC transport, in-memory LocalChain)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **Two contract flavours**: clear-text scores or encrypted handles
//! - **Last request wins**: stale runtime constructions never publish
//! - **Closed error taxonomy**: every chain failure carries an [`ErrorKind`]
//! - **Local chain**: both contracts in memory, with fault injection

pub mod chain;
pub mod contract;
pub mod errors;
pub mod local;
pub mod networks;
pub mod notify;
pub mod orchestrator;
pub mod progress;
pub mod roster;
pub mod runtime;
pub mod session;

// Re-export main types
pub use chain::{
    Eip1193Provider, EncryptedInput, PendingTransaction, PlayerRecord, PlayerTable, TxHash,
    TxReceipt, VotingReader, VotingSigner,
};
pub use contract::{AddressBook, ContractInfo, ContractKind, ContractResolver, Deployment};
pub use errors::{
    ChainError, ChainResult, ErrorKind, RuntimeError, RuntimeResult, VotingError, VotingResult,
};
pub use local::{Fault, LocalChain, LocalMethod, LocalWalletBackend};
pub use networks::{NetworkEnv, LOCAL_CHAIN_ID, SEPOLIA_CHAIN_ID};
pub use notify::{MemoryNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use orchestrator::{
    DecryptPolicy, OrchestratorBuilder, OrchestratorConfig, VotingOrchestrator, VotingView,
    DEFAULT_RATING, RATING_RANGE,
};
pub use progress::{progress_channel, DecryptProgress, ProgressReceiver, ProgressSender};
pub use roster::PlayerSnapshot;
pub use runtime::{
    EncryptionRuntime, MockCoprocessor, MockRuntimeFactory, RuntimeBridge, RuntimeFactory,
    RuntimeStatus,
};
pub use session::{SessionState, WalletAdapter, WalletBackend, WalletEvent};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chain::{Eip1193Provider, VotingReader, VotingSigner};
    pub use crate::contract::{ContractKind, ContractResolver};
    pub use crate::errors::{ChainError, ErrorKind, VotingError};
    pub use crate::notify::{Notice, Notifier};
    pub use crate::orchestrator::{OrchestratorBuilder, VotingOrchestrator};
    pub use crate::session::{WalletAdapter, WalletEvent};
}
