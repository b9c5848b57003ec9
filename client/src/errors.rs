//! Client Error Types
//!
//! Chain interaction reports failures as a [`ChainError`] carrying a closed
//! [`ErrorKind`]. Classification (revert reasons, wallet rejection codes,
//! relayer outages) happens once, in the transport that produced the error.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Revert reason emitted when a signer votes a second time
pub const REVERT_ALREADY_VOTED: &str = "Already voted";

/// Revert reason emitted for an out-of-range player id
pub const REVERT_INVALID_PLAYER: &str = "Invalid player";

/// Revert reason emitted for a rating outside 1..=11
pub const REVERT_RATING_RANGE: &str = "Rating must be between 1 and 11";

/// Closed classification of chain-interaction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The signer has already cast its ballot
    AlreadyVoted,
    /// The player id does not exist on the contract
    InvalidPlayer,
    /// The rating is outside the accepted range
    RatingOutOfRange,
    /// The wallet user declined to sign the transaction
    UserRejected,
    /// The encryption relayer or key service did not answer
    RelayerUnavailable,
    /// Encrypted payload or returned data could not be decoded
    MalformedPayload,
    /// The call reverted without a recognised reason
    CallException,
    /// The caller may not reveal the requested ciphertext
    DecryptionDenied,
    /// The RPC endpoint could not be reached
    Transport,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Map a decoded revert reason to its kind
    pub fn from_revert_reason(reason: &str) -> Self {
        match reason.trim() {
            REVERT_ALREADY_VOTED => ErrorKind::AlreadyVoted,
            REVERT_INVALID_PLAYER => ErrorKind::InvalidPlayer,
            REVERT_RATING_RANGE => ErrorKind::RatingOutOfRange,
            _ => ErrorKind::CallException,
        }
    }

    /// Message shown to the user, `None` for kinds that need operation context
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ErrorKind::AlreadyVoted => {
                Some("You have already voted. Each user can only vote once.")
            }
            ErrorKind::InvalidPlayer => Some("Invalid player selected. Please try again."),
            ErrorKind::RatingOutOfRange => {
                Some("Rating must be between 1 and 11. Please select a valid rating.")
            }
            ErrorKind::UserRejected => Some("Transaction cancelled in your wallet."),
            ErrorKind::RelayerUnavailable => Some(
                "FHEVM relayer service is currently unavailable. This is a temporary network issue. \
                 Please try again in a few minutes.",
            ),
            ErrorKind::MalformedPayload => {
                Some("Invalid encrypted data format. Please refresh the page and try again.")
            }
            ErrorKind::CallException => Some(
                "Transaction failed. You may have already voted or there may be a network issue. \
                 Please refresh the page and try again.",
            ),
            ErrorKind::DecryptionDenied => {
                Some("Decryption failed. Make sure you have permission to decrypt this data.")
            }
            ErrorKind::Transport | ErrorKind::Unknown => None,
        }
    }

    /// Whether retrying later can succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::RelayerUnavailable | ErrorKind::Transport)
    }

    /// Whether the local view is likely stale and should be reloaded
    pub fn requires_refresh(&self) -> bool {
        matches!(self, ErrorKind::MalformedPayload | ErrorKind::CallException)
    }
}

/// Failure reported by a chain reader, signer, provider or runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({kind:?})")]
pub struct ChainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a decoded revert reason
    pub fn revert(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            kind: ErrorKind::from_revert_reason(&reason),
            message: reason,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPayload, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Result type for chain interaction
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors raised while building or using an encryption runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Runtime construction aborted")]
    Aborted,

    #[error("No encryption runtime available for chain {0}")]
    UnsupportedChain(u64),

    #[error("Provider is not bound to a chain")]
    MissingChain,

    #[error("Provider reports chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Relayer unavailable: {0}")]
    RelayerUnavailable(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ChainError),

    #[error("Input proof rejected")]
    InvalidProof,

    #[error("Unknown ciphertext handle {0}")]
    UnknownHandle(B256),

    #[error("{user} is not allowed to decrypt {handle}")]
    AccessDenied { handle: B256, user: Address },

    #[error("Ciphertext overflow")]
    Overflow,
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::RelayerUnavailable(_) => ErrorKind::RelayerUnavailable,
            RuntimeError::Provider(e) => e.kind,
            RuntimeError::InvalidProof | RuntimeError::UnknownHandle(_) => {
                ErrorKind::MalformedPayload
            }
            RuntimeError::AccessDenied { .. } => ErrorKind::DecryptionDenied,
            RuntimeError::Aborted
            | RuntimeError::UnsupportedChain(_)
            | RuntimeError::MissingChain
            | RuntimeError::ChainMismatch { .. }
            | RuntimeError::Overflow => ErrorKind::Unknown,
        }
    }
}

impl From<RuntimeError> for ChainError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Provider(inner) => inner,
            other => ChainError::new(other.kind(), other.to_string()),
        }
    }
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by orchestrator operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("Network mismatch: contract is on {contract} but wallet is on {wallet}")]
    NetworkMismatch { contract: String, wallet: String },

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("No contract deployed on chain {0:?}")]
    ContractNotDeployed(Option<u64>),

    #[error("Encryption runtime not ready")]
    RuntimeNotReady,

    #[error("Player {0} not found")]
    PlayerNotFound(u32),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl VotingError {
    /// Classified kind for chain and runtime failures
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            VotingError::Chain(e) => Some(e.kind),
            VotingError::Runtime(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Message shown to the user; `fallback` covers unclassified failures
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            VotingError::NetworkMismatch { contract, wallet } => format!(
                "Network mismatch! Contract is on {contract} but wallet is on {wallet}.\n\n\
                 Please switch to {contract} network in your wallet."
            ),
            VotingError::WalletNotConnected => {
                "Wallet not connected. Please connect your wallet.".to_string()
            }
            VotingError::ContractNotDeployed(_) => {
                "No deployment for this network.".to_string()
            }
            VotingError::RuntimeNotReady => {
                "FHE runtime not ready. Please wait for initialization.".to_string()
            }
            VotingError::PlayerNotFound(_) => "Player not found.".to_string(),
            VotingError::Chain(_) | VotingError::Runtime(_) => self
                .kind()
                .and_then(|kind| kind.user_message())
                .unwrap_or(fallback)
                .to_string(),
        }
    }
}

/// Result type for orchestrator operations
pub type VotingResult<T> = Result<T, VotingError>;
