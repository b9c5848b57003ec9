//! Votechain: wallet-connected player voting
//!
//! This is the root crate that re-exports the votechain components for
//! integration testing.
//!
//! ## Overview
//!
//! Users rate players on a voting contract and later reveal the aggregated
//! score. Two contract flavours exist:
//!
//! - **SimpleVoting**: clear-text scores
//! - **EncryptedMvpVoting**: scores held as ciphertext handles, revealed
//!   through an encryption runtime subject to an access list
//!
//! ## Crate Organization
//!
//! - `votechain-client`: resolver, session, runtime bridge, orchestrator,
//!   in-memory local chain
//! - `votechain-rpc`: Ethereum JSON-RPC transport and ABI codec
//! - `votechain-cli`: the `votechain` binary

pub use votechain_client as client;
pub use votechain_rpc as rpc;

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use votechain_client::prelude::*;
    pub use votechain_rpc::{HttpProvider, RpcWalletBackend};
}
