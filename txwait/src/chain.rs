// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Data model for the chain controller's block feed and submission API.
//!
//! The controller is an external collaborator: it validates and stores
//! blocks, accepts transaction submissions, and exposes the block feed the
//! tracker consumes. Everything here mirrors the controller's wire shapes.

use crate::error::ChainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A transaction id: 32 bytes, rendered as lowercase hex on the wire.
///
/// The all-zero id is the default/empty sentinel and is never a valid
/// submission.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId([u8; 32]);

#[derive(Debug, Error)]
#[error("invalid transaction id: {0}")]
pub struct InvalidTransactionId(String);

impl TransactionId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

impl FromStr for TransactionId {
    type Err = InvalidTransactionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|_| InvalidTransactionId(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| InvalidTransactionId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The transaction fields the tracker needs from a block receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(default)]
    pub ref_block_num: u16,
    #[serde(default)]
    pub ref_block_prefix: u32,
}

/// A block's transaction receipt: either a bare id or a full transaction
/// body. Only bodied receipts carry the `ref_block_*` fields the wait
/// response needs, so the tracker skips bare ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReceipt {
    TransactionId(TransactionId),
    PackedTransaction(Transaction),
}

/// Half-second tick carried in every block header. The canonical time
/// coordinate of the tracker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockTimestamp {
    pub slot: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub timestamp: BlockTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block_num: u32,
    #[serde(default)]
    pub transactions: Vec<TransactionReceipt>,
}

/// A produced or validated block as delivered by the controller's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub header: BlockHeader,
    pub block: SignedBlock,
}

impl BlockState {
    pub fn block_num(&self) -> u32 {
        self.block.block_num
    }

    pub fn slot(&self) -> u32 {
        self.header.timestamp.slot
    }
}

/// Chain head summary returned by the controller's `get_info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub head_block_num: u32,
    pub last_irreversible_block_num: u32,
}

/// Result of a successful `push_transaction`/`send_transaction`.
///
/// `processed` is the controller's execution trace, forwarded to the client
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionResults {
    pub transaction_id: TransactionId,
    #[serde(default)]
    pub expiration_slot: u32,
    #[serde(default)]
    pub processed: Value,
}

/// Client for the chain controller's HTTP API.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_info(&self) -> ChainResult<ChainInfo>;

    async fn get_block(&self, block_num: u32) -> ChainResult<BlockState>;

    async fn push_transaction(&self, params: Value) -> ChainResult<PushTransactionResults>;

    async fn send_transaction(&self, params: Value) -> ChainResult<PushTransactionResults>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_hex_round_trip() {
        let id = TransactionId::new([0xab; 32]);
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 64);
        assert_eq!(rendered.parse::<TransactionId>().unwrap(), id);

        // 0x prefix is accepted on parse
        let prefixed: TransactionId = format!("0x{}", rendered).parse().unwrap();
        assert_eq!(prefixed, id);
    }

    #[test]
    fn test_transaction_id_rejects_bad_input() {
        assert!("zz".parse::<TransactionId>().is_err());
        assert!("abcd".parse::<TransactionId>().is_err()); // wrong length
        assert!("".parse::<TransactionId>().is_err());
    }

    #[test]
    fn test_transaction_id_serde() {
        let id = TransactionId::new([0x11; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_receipt_wire_union() {
        let bare = TransactionReceipt::TransactionId(TransactionId::new([0x22; 32]));
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("transaction_id").is_some());

        let packed = TransactionReceipt::PackedTransaction(Transaction {
            id: TransactionId::new([0x22; 32]),
            ref_block_num: 11,
            ref_block_prefix: 22,
        });
        let json = serde_json::to_value(&packed).unwrap();
        assert_eq!(json["packed_transaction"]["ref_block_num"], 11);
    }

    #[test]
    fn test_block_state_decode() {
        let raw = serde_json::json!({
            "header": { "timestamp": { "slot": 1000 } },
            "block": {
                "block_num": 500,
                "transactions": [
                    { "transaction_id": "22".repeat(32) },
                    { "packed_transaction": {
                        "id": "33".repeat(32),
                        "ref_block_num": 1,
                        "ref_block_prefix": 2
                    } }
                ]
            }
        });
        let block: BlockState = serde_json::from_value(raw).unwrap();
        assert_eq!(block.block_num(), 500);
        assert_eq!(block.slot(), 1000);
        assert_eq!(block.block.transactions.len(), 2);
    }
}
