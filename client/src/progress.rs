//! Decrypt progress channel
//!
//! `decrypt_locally` publishes an ordered sequence of [`DecryptProgress`]
//! events. Every run ends with exactly one terminal event.

use crate::chain::TxHash;
use crate::errors::ErrorKind;
use std::fmt;
use tokio::sync::mpsc;

/// One step of the decrypt-and-reveal flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptProgress {
    Started,
    SendingTransaction,
    AwaitingConfirmation { tx_hash: TxHash },
    Confirmed,
    /// Grant failed for a reason other than rejection; reading directly
    FallingBack,
    FetchingData,
    DataRetrieved,
    /// Terminal: value revealed
    Completed { clear: u64 },
    /// Terminal: the user declined the grant transaction
    Cancelled,
    /// Terminal: the flow aborted
    Failed { kind: Option<ErrorKind> },
}

impl DecryptProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DecryptProgress::Completed { .. }
                | DecryptProgress::Cancelled
                | DecryptProgress::Failed { .. }
        )
    }
}

impl fmt::Display for DecryptProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecryptProgress::Started => write!(f, "Starting decryption process..."),
            DecryptProgress::SendingTransaction => write!(f, "Sending transaction to wallet..."),
            DecryptProgress::AwaitingConfirmation { tx_hash } => {
                write!(f, "Waiting for transaction confirmation ({tx_hash})...")
            }
            DecryptProgress::Confirmed => write!(f, "Transaction confirmed!"),
            DecryptProgress::FallingBack => write!(f, "Proceeding with direct data access"),
            DecryptProgress::FetchingData => write!(f, "Fetching decrypted vote data..."),
            DecryptProgress::DataRetrieved => write!(f, "Data retrieved successfully"),
            DecryptProgress::Completed { clear } => {
                write!(f, "Decryption completed successfully! ({clear})")
            }
            DecryptProgress::Cancelled => write!(f, "Transaction cancelled by user"),
            DecryptProgress::Failed { kind: Some(kind) } => write!(f, "Operation failed: {kind:?}"),
            DecryptProgress::Failed { kind: None } => write!(f, "Operation failed"),
        }
    }
}

/// Sending half handed to `decrypt_locally`
pub type ProgressSender = mpsc::UnboundedSender<DecryptProgress>;

/// Receiving half kept by the caller
pub type ProgressReceiver = mpsc::UnboundedReceiver<DecryptProgress>;

/// Create a progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Optional sender that tolerates a dropped receiver
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressReporter {
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn emit(&self, event: DecryptProgress) {
        if let Some(sender) = &self.sender {
            // receiver may be gone
            let _ = sender.send(event);
        }
    }
}
