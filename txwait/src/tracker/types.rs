// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire bodies and the per-transaction state machine.

use crate::chain::{Transaction, TransactionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::Location;

/// Condition a transaction can reach. The numeric values double as the HTTP
/// status codes of the wait response and are part of the external contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum TxCondition {
    #[default]
    None = 0,
    Finalized = 201,
    Accepted = 202,
    Invalid = 422,
}

impl TxCondition {
    pub fn parse(cond: &str) -> Self {
        match cond {
            "accepted" => TxCondition::Accepted,
            "finalized" => TxCondition::Finalized,
            _ => TxCondition::Invalid,
        }
    }

    pub fn status_code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for TxCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxCondition::None => write!(f, "none"),
            TxCondition::Finalized => write!(f, "finalized"),
            TxCondition::Accepted => write!(f, "accepted"),
            TxCondition::Invalid => write!(f, "invalid"),
        }
    }
}

/// Body of a `wait_transaction` request.
///
/// All fields are defaulted so an empty object parses and is rejected by
/// the id/condition validation rather than the codec.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct WaitTransactionParams {
    pub transaction_id: TransactionId,
    /// Must be either "accepted" or "finalized"
    pub condition: String,
    /// Duration in seconds for the wait to expire. Ignored by the local
    /// tracking policy.
    pub timeout: u32,
}

/// Successful wait response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitResponse {
    pub block_num: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub file: String,
    pub line_number: u64,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub details: Vec<ErrorDetail>,
}

/// Error response body. `error.details[0]` identifies the origin site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    #[track_caller]
    pub fn new(code: u16, method: &str, message: impl Into<String>) -> Self {
        let location = Location::caller();
        ErrorResponse {
            code,
            message: message.into(),
            error: ErrorInfo {
                details: vec![ErrorDetail {
                    file: location.file().to_string(),
                    line_number: location.line() as u64,
                    method: method.to_string(),
                }],
            },
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("error body is serializable")
    }
}

/// One-shot HTTP continuation. Moved out of its slot before invocation, so
/// a re-entrant wait on the same id observes "no pending wait".
pub type WaitCallback = Box<dyn FnOnce(u16, Value) + Send + 'static>;

/// Per-transaction tracking record.
///
/// `expiration_slot` is the lib slot for this record to expire. Before the
/// first irreversible block is observed it holds a relative offset; the
/// tracker rewrites it to an absolute slot on first irreversibility.
pub struct TrackedTransaction {
    pub id: TransactionId,
    pub expiration_slot: u32,
    wait_condition: TxCondition,
    result_status: TxCondition,
    response: WaitResponse,
    wait_cb: Option<WaitCallback>,
}

impl TrackedTransaction {
    pub fn new(id: TransactionId, expiration_slot: u32) -> Self {
        TrackedTransaction {
            id,
            expiration_slot,
            wait_condition: TxCondition::None,
            result_status: TxCondition::None,
            response: WaitResponse::default(),
            wait_cb: None,
        }
    }

    pub fn result_status(&self) -> TxCondition {
        self.result_status
    }

    pub fn response(&self) -> &WaitResponse {
        &self.response
    }

    pub fn has_pending_wait(&self) -> bool {
        self.wait_cb.is_some()
    }

    /// Register a wait. Replies immediately when the condition is already
    /// satisfied or another wait is parked; parks the callback otherwise.
    pub fn on_wait_request(&mut self, request_condition: TxCondition, cb: WaitCallback) {
        if request_condition == self.result_status {
            let body = serde_json::to_value(self.response).expect("wait body is serializable");
            cb(self.result_status.status_code(), body);
            return;
        }

        if self.wait_cb.is_some() {
            cb(
                403,
                ErrorResponse::new(403, "on_wait_request", "pending wait on the transaction exists")
                    .to_value(),
            );
        } else {
            self.wait_cb = Some(cb);
            self.wait_condition = request_condition;
        }
    }

    /// Record a block observation and fire the parked callback when it was
    /// waiting for exactly this condition.
    pub fn on_block(&mut self, condition: TxCondition, block_num: u32, trx: &Transaction) {
        self.result_status = condition;
        self.response.block_num = block_num;
        self.response.ref_block_num = trx.ref_block_num;
        self.response.ref_block_prefix = trx.ref_block_prefix;

        if self.wait_condition == condition {
            if let Some(cb) = self.wait_cb.take() {
                let body = serde_json::to_value(self.response).expect("wait body is serializable");
                cb(self.result_status.status_code(), body);
            }
        }
    }

    /// Fire the 504 timeout reply, if a wait is still parked. The caller
    /// erases the record afterwards.
    pub fn on_expired(&mut self) {
        if let Some(cb) = self.wait_cb.take() {
            cb(
                504,
                ErrorResponse::new(504, "on_expired", "wait transaction expired").to_value(),
            );
        }
    }
}
