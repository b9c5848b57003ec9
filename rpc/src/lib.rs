//! Votechain RPC
//!
//! Ethereum JSON-RPC transport for the voting contracts.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │        votechain-client seams                      │
//! │  Eip1193Provider · VotingReader · VotingSigner     │
//! └───────────┬──────────────────────┬─────────────────┘
//!             │                      │
//!             ▼                      ▼
//! ┌──────────────────────┐  ┌──────────────────────────┐
//! │  RpcReader/RpcSigner │  │     RpcWalletBackend     │
//! │  eth_call · eth_send │  │  public client + signer  │
//! └───────────┬──────────┘  └──────────────────────────┘
//!             ▼
//! ┌────────────────────────────────────────────────────┐
//! │  codec (sol! ABI)  ·  HttpProvider (jsonrpsee)     │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! Node errors are classified into the client's `ErrorKind` in
//! [`errors`], so revert reasons such as `Already voted` survive the trip.

pub mod client;
pub mod codec;
pub mod errors;
pub mod provider;
pub mod types;
pub mod wallet;

pub use client::{RpcPendingTx, RpcReader, RpcSigner};
pub use errors::{RpcError, RpcResult};
pub use provider::HttpProvider;
pub use types::{TransactionReceipt, TransactionRequest};
pub use wallet::RpcWalletBackend;

/// Default Hardhat / Anvil port
pub const DEFAULT_RPC_PORT: u16 = 8545;
