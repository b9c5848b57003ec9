//! Contract ABI Codec
//!
//! Calldata builders and return decoders for both voting contracts. The
//! two flavours share selectors for every read; only the score type differs.

use crate::errors::{RpcError, RpcResult};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use votechain_client::chain::{PlayerRecord, PlayerTable};
use votechain_client::contract::ContractKind;

sol! {
    interface SimpleVoting {
        function admin() external view returns (address);
        function totalPlayers() external view returns (uint256);
        function listPlayers() external view returns (string[] names, uint256[] scores, uint256[] ballots);
        function getPlayer(uint256 playerId) external view returns (string name, uint256 score, uint256 ballots);
        function voteFor(uint256 playerId, uint8 rating) external;
        function allowAdminToDecrypt(uint256 playerId) external;
    }

    interface EncryptedMvpVoting {
        function listPlayers() external view returns (string[] names, bytes32[] scores, uint256[] ballots);
        function getPlayer(uint256 playerId) external view returns (string name, bytes32 score, uint256 ballots);
        function voteFor(uint256 playerId, bytes32 encryptedRating, bytes inputProof) external;
    }
}

fn ballot_count(value: U256) -> RpcResult<u64> {
    u64::try_from(value).map_err(|_| RpcError::Abi(format!("ballot count {value} exceeds u64")))
}

fn handle_word(handle: B256) -> U256 {
    U256::from_be_bytes(handle.0)
}

pub fn admin_calldata() -> Vec<u8> {
    SimpleVoting::adminCall {}.abi_encode()
}

pub fn decode_admin(data: &[u8]) -> RpcResult<Address> {
    Ok(SimpleVoting::adminCall::abi_decode_returns(data, true)?._0)
}

pub fn total_players_calldata() -> Vec<u8> {
    SimpleVoting::totalPlayersCall {}.abi_encode()
}

pub fn decode_total_players(data: &[u8]) -> RpcResult<u64> {
    let total = SimpleVoting::totalPlayersCall::abi_decode_returns(data, true)?._0;
    u64::try_from(total).map_err(|_| RpcError::Abi(format!("player count {total} exceeds u64")))
}

pub fn list_players_calldata() -> Vec<u8> {
    SimpleVoting::listPlayersCall {}.abi_encode()
}

/// Decode `listPlayers()` for the given contract flavour
pub fn decode_list_players(kind: ContractKind, data: &[u8]) -> RpcResult<PlayerTable> {
    let (names, scores, ballots) = match kind {
        ContractKind::Simple => {
            let ret = SimpleVoting::listPlayersCall::abi_decode_returns(data, true)?;
            (ret.names, ret.scores, ret.ballots)
        }
        ContractKind::Encrypted => {
            let ret = EncryptedMvpVoting::listPlayersCall::abi_decode_returns(data, true)?;
            let scores = ret.scores.into_iter().map(handle_word).collect();
            (ret.names, scores, ret.ballots)
        }
    };

    Ok(PlayerTable {
        names,
        scores,
        ballots: ballots
            .into_iter()
            .map(ballot_count)
            .collect::<RpcResult<_>>()?,
    })
}

pub fn get_player_calldata(player_id: u32) -> Vec<u8> {
    SimpleVoting::getPlayerCall {
        playerId: U256::from(player_id),
    }
    .abi_encode()
}

/// Decode `getPlayer(id)` for the given contract flavour
pub fn decode_get_player(kind: ContractKind, data: &[u8]) -> RpcResult<PlayerRecord> {
    match kind {
        ContractKind::Simple => {
            let ret = SimpleVoting::getPlayerCall::abi_decode_returns(data, true)?;
            Ok(PlayerRecord {
                name: ret.name,
                score: ret.score,
                ballots: ballot_count(ret.ballots)?,
            })
        }
        ContractKind::Encrypted => {
            let ret = EncryptedMvpVoting::getPlayerCall::abi_decode_returns(data, true)?;
            Ok(PlayerRecord {
                name: ret.name,
                score: handle_word(ret.score),
                ballots: ballot_count(ret.ballots)?,
            })
        }
    }
}

pub fn vote_for_calldata(player_id: u32, rating: u8) -> Vec<u8> {
    SimpleVoting::voteForCall {
        playerId: U256::from(player_id),
        rating,
    }
    .abi_encode()
}

pub fn vote_for_encrypted_calldata(player_id: u32, handle: B256, input_proof: &Bytes) -> Vec<u8> {
    EncryptedMvpVoting::voteForCall {
        playerId: U256::from(player_id),
        encryptedRating: handle,
        inputProof: input_proof.clone(),
    }
    .abi_encode()
}

pub fn allow_admin_to_decrypt_calldata(player_id: u32) -> Vec<u8> {
    SimpleVoting::allowAdminToDecryptCall {
        playerId: U256::from(player_id),
    }
    .abi_encode()
}
