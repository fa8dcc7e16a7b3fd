// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for unit tests.

use crate::chain::{
    BlockHeader, BlockState, BlockTimestamp, SignedBlock, Transaction, TransactionId,
    TransactionReceipt,
};
use crate::tracker::types::WaitCallback;
use std::sync::{Arc, Mutex};

/// A test transaction id: 32 repeated bytes.
pub fn tid(n: u8) -> TransactionId {
    TransactionId::new([n; 32])
}

pub fn packed(n: u8, ref_block_num: u16, ref_block_prefix: u32) -> TransactionReceipt {
    TransactionReceipt::PackedTransaction(Transaction {
        id: tid(n),
        ref_block_num,
        ref_block_prefix,
    })
}

pub fn bare(n: u8) -> TransactionReceipt {
    TransactionReceipt::TransactionId(tid(n))
}

pub fn make_block_state(
    block_num: u32,
    slot: u32,
    transactions: Vec<TransactionReceipt>,
) -> BlockState {
    BlockState {
        header: BlockHeader {
            timestamp: BlockTimestamp { slot },
        },
        block: SignedBlock {
            block_num,
            transactions,
        },
    }
}

pub fn wait_body(id: TransactionId, condition: &str, timeout: u32) -> String {
    format!(
        r#"{{"transaction_id":"{id}", "condition":"{condition}", "timeout":{timeout}}}"#
    )
}

/// Observed side effects of a wait callback.
#[derive(Default)]
pub struct ResponseState {
    pub handler_called: u32,
    pub status: u16,
    pub msg: String,
}

pub fn response_handler(state: Arc<Mutex<ResponseState>>) -> WaitCallback {
    Box::new(move |status, msg| {
        let mut state = state.lock().unwrap();
        state.handler_called += 1;
        state.status = status;
        state.msg = msg.to_string();
    })
}
