//! RPC Error Types
//!
//! Transport failures are classified here, once, into the client's closed
//! [`ErrorKind`] taxonomy.

use alloy_primitives::{hex, B256};
use jsonrpsee::core::ClientError;
use serde_json::Value;
use thiserror::Error;
use votechain_client::errors::{ChainError, ErrorKind};

/// EIP-1193 code for a request the user rejected
pub const USER_REJECTED_CODE: i32 = 4001;

/// Geth-style code for a reverted call carrying revert data
pub const EXECUTION_REVERTED_CODE: i32 = 3;

/// RPC errors
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Call {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Timed out waiting for receipt of {0}")]
    ReceiptTimeout(B256),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Call(object) => RpcError::Call {
                code: object.code(),
                message: object.message().to_string(),
                data: object
                    .data()
                    .and_then(|raw| serde_json::from_str(raw.get()).ok()),
            },
            ClientError::ParseError(e) => RpcError::InvalidResponse(e.to_string()),
            other => RpcError::Transport(other.to_string()),
        }
    }
}

impl From<alloy_sol_types::Error> for RpcError {
    fn from(err: alloy_sol_types::Error) -> Self {
        RpcError::Abi(err.to_string())
    }
}

/// Revert reason carried by an error `data` field
///
/// Nodes put the ABI-encoded `Error(string)` either directly in `data` or
/// nested under `data.data`.
fn revert_reason_from_data(data: &Value) -> Option<String> {
    let encoded = match data {
        Value::String(s) => s.as_str(),
        Value::Object(map) => return map.get("data").and_then(revert_reason_from_data),
        _ => return None,
    };
    let bytes = hex::decode(encoded).ok()?;
    alloy_sol_types::decode_revert_reason(&bytes)
        .map(|reason| reason.trim_start_matches("revert: ").to_string())
}

/// Revert reason embedded in a node's error message
fn revert_reason_from_message(message: &str) -> Option<String> {
    const QUOTED: &str = "reverted with reason string '";
    if let Some(start) = message.find(QUOTED) {
        let rest = &message[start + QUOTED.len()..];
        return rest.find('\'').map(|end| rest[..end].to_string());
    }

    const EXECUTION: &str = "execution reverted: ";
    message
        .find(EXECUTION)
        .map(|start| message[start + EXECUTION.len()..].trim().to_string())
        .filter(|reason| !reason.is_empty())
}

fn is_rejection(code: i32, message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    code == USER_REJECTED_CODE || lower.contains("user denied") || lower.contains("user rejected")
}

/// Messages a failing encryption relayer surfaces through the node or wallet
const RELAYER_FAILURES: &[&str] = &[
    "relayer didn't response correctly",
    "backend connection task has stopped",
    "relayer.testnet.zama.cloud",
];

fn is_relayer_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RELAYER_FAILURES.iter().any(|needle| lower.contains(needle))
}

impl RpcError {
    /// Classified kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.classify().kind
    }

    /// Map to the client error taxonomy
    pub fn classify(&self) -> ChainError {
        match self {
            RpcError::Call {
                code,
                message,
                data,
            } => {
                if is_rejection(*code, message) {
                    return ChainError::new(ErrorKind::UserRejected, message.clone());
                }
                if is_relayer_failure(message) {
                    return ChainError::new(ErrorKind::RelayerUnavailable, message.clone());
                }
                if let Some(reason) = data
                    .as_ref()
                    .and_then(revert_reason_from_data)
                    .or_else(|| revert_reason_from_message(message))
                {
                    return ChainError::revert(reason);
                }
                if *code == EXECUTION_REVERTED_CODE || message.contains("revert") {
                    return ChainError::new(ErrorKind::CallException, message.clone());
                }
                ChainError::new(ErrorKind::Unknown, self.to_string())
            }
            RpcError::Transport(message) if is_relayer_failure(message) => {
                ChainError::new(ErrorKind::RelayerUnavailable, self.to_string())
            }
            RpcError::Reverted(_) => ChainError::new(ErrorKind::CallException, self.to_string()),
            RpcError::InvalidResponse(_) | RpcError::Abi(_) => {
                ChainError::malformed(self.to_string())
            }
            RpcError::Transport(_) | RpcError::ReceiptTimeout(_) | RpcError::InvalidEndpoint(_) => {
                ChainError::transport(self.to_string())
            }
        }
    }
}

impl From<RpcError> for ChainError {
    fn from(err: RpcError) -> Self {
        err.classify()
    }
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::{Revert, SolError};
    use serde_json::json;

    fn encoded_revert(reason: &str) -> String {
        let revert = Revert {
            reason: reason.to_string(),
        };
        format!("0x{}", hex::encode(revert.abi_encode()))
    }

    #[test]
    fn test_user_rejection() {
        let err = RpcError::Call {
            code: USER_REJECTED_CODE,
            message: "MetaMask Tx Signature: User denied transaction signature.".into(),
            data: None,
        };
        assert_eq!(err.kind(), ErrorKind::UserRejected);
    }

    #[test]
    fn test_relayer_unavailable() {
        let err = RpcError::Call {
            code: -32603,
            message: "Relayer didn't response correctly. Bad status.".into(),
            data: None,
        };
        let classified = err.classify();
        assert_eq!(classified.kind, ErrorKind::RelayerUnavailable);
        assert!(classified.kind.is_transient());

        let err = RpcError::Transport(
            "error sending request for url (https://relayer.testnet.zama.cloud/v1/keyurl)".into(),
        );
        assert_eq!(err.kind(), ErrorKind::RelayerUnavailable);

        let err = RpcError::Call {
            code: USER_REJECTED_CODE,
            message: "User rejected the request; backend connection task has stopped".into(),
            data: None,
        };
        assert_eq!(err.kind(), ErrorKind::UserRejected);
    }

    #[test]
    fn test_revert_data_is_decoded() {
        let err = RpcError::Call {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted".into(),
            data: Some(json!(encoded_revert("Already voted"))),
        };
        let classified = err.classify();
        assert_eq!(classified.kind, ErrorKind::AlreadyVoted);
        assert_eq!(classified.message, "Already voted");
    }

    #[test]
    fn test_nested_revert_data() {
        let err = RpcError::Call {
            code: -32603,
            message: "Internal error".into(),
            data: Some(json!({
                "message": "Error: VM Exception while processing transaction",
                "data": encoded_revert("Invalid player"),
            })),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidPlayer);
    }

    #[test]
    fn test_reason_from_message() {
        let err = RpcError::Call {
            code: -32603,
            message: "Error: VM Exception while processing transaction: reverted with reason \
                      string 'Rating must be between 1 and 11'"
                .into(),
            data: None,
        };
        assert_eq!(err.kind(), ErrorKind::RatingOutOfRange);

        let err = RpcError::Call {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted: Already voted".into(),
            data: None,
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
    }

    #[test]
    fn test_bare_revert_is_call_exception() {
        let err = RpcError::Call {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted".into(),
            data: Some(json!("0x")),
        };
        assert_eq!(err.kind(), ErrorKind::CallException);
        assert_eq!(RpcError::Reverted(B256::ZERO).kind(), ErrorKind::CallException);
    }

    #[test]
    fn test_infrastructure_errors() {
        assert_eq!(
            RpcError::Transport("connection refused".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            RpcError::Abi("buffer overrun".into()).kind(),
            ErrorKind::MalformedPayload
        );
        let unknown = RpcError::Call {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        assert_eq!(unknown.kind(), ErrorKind::Unknown);
    }
}
