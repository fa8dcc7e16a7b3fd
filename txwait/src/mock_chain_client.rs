// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock `ChainClient` that serves preset info, blocks, and submission
//! results.

use crate::chain::{BlockState, ChainClient, ChainInfo, PushTransactionResults};
use crate::error::{ChainClientError, ChainResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockChainClient {
    info: Arc<Mutex<ChainInfo>>,
    blocks: Arc<Mutex<HashMap<u32, BlockState>>>,
    submit_results: Arc<Mutex<VecDeque<ChainResult<PushTransactionResults>>>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_info(&self, head_block_num: u32, last_irreversible_block_num: u32) {
        *self.info.lock().unwrap() = ChainInfo {
            head_block_num,
            last_irreversible_block_num,
        };
    }

    pub fn add_block(&self, block_state: BlockState) {
        self.blocks
            .lock()
            .unwrap()
            .insert(block_state.block_num(), block_state);
    }

    pub fn add_submit_result(&self, result: ChainResult<PushTransactionResults>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    fn next_submit_result(&self) -> ChainResult<PushTransactionResults> {
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            // Ok to panic in test
            .expect("no preset submit result")
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_info(&self) -> ChainResult<ChainInfo> {
        Ok(*self.info.lock().unwrap())
    }

    async fn get_block(&self, block_num: u32) -> ChainResult<BlockState> {
        self.blocks
            .lock()
            .unwrap()
            .get(&block_num)
            .cloned()
            .ok_or_else(|| ChainClientError::Status {
                code: 404,
                message: format!("no preset block {block_num}"),
            })
    }

    async fn push_transaction(&self, _params: Value) -> ChainResult<PushTransactionResults> {
        self.next_submit_result()
    }

    async fn send_transaction(&self, _params: Value) -> ChainResult<PushTransactionResults> {
        self.next_submit_result()
    }
}
