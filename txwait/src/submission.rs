// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Couples transaction submission to wait tracking: a successful push/send
//! registers the returned id with the tracker so a later wait request can
//! match it. Failed submissions never touch the tracker.

use crate::chain::{ChainClient, PushTransactionResults};
use crate::error::ChainResult;
use crate::tracker::service::TrackerHandle;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitKind {
    Push,
    Send,
}

impl SubmitKind {
    pub fn action(&self) -> &'static str {
        match self {
            SubmitKind::Push => "push_transaction",
            SubmitKind::Send => "send_transaction",
        }
    }
}

pub struct SubmissionBridge<C> {
    client: Arc<C>,
    tracker: TrackerHandle,
}

impl<C: ChainClient> SubmissionBridge<C> {
    pub fn new(client: Arc<C>, tracker: TrackerHandle) -> Self {
        SubmissionBridge { client, tracker }
    }

    pub async fn submit(
        &self,
        kind: SubmitKind,
        params: Value,
    ) -> ChainResult<PushTransactionResults> {
        let results = match kind {
            SubmitKind::Push => self.client.push_transaction(params).await?,
            SubmitKind::Send => self.client.send_transaction(params).await?,
        };

        self.tracker.track(results.transaction_id);
        info!(
            transaction_id = %results.transaction_id,
            action = kind.action(),
            "submitted transaction"
        );
        Ok(results)
    }
}
