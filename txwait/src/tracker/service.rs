// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serialized access to a tracker.
//!
//! One tokio task owns the tracker and drains a command channel, so block
//! events and wait requests are applied in arrival order with no interior
//! locking. HTTP continuations cross back as oneshot sends.

use super::types::{ErrorResponse, WaitCallback};
use super::TransactionTracker;
use crate::chain::{BlockState, TransactionId};
use crate::metrics::NodeMetrics;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub enum TrackerCommand {
    AcceptedBlock(BlockState),
    IrreversibleBlock(BlockState),
    Wait { body: String, cb: WaitCallback },
    Track(TransactionId),
}

/// Cloneable sender half of the tracker task.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<TrackerCommand>,
}

impl TrackerHandle {
    pub fn accepted_block(&self, block_state: BlockState) {
        // send fails only at shutdown, when nobody wants the event anyway
        let _ = self
            .commands
            .send(TrackerCommand::AcceptedBlock(block_state));
    }

    pub fn irreversible_block(&self, block_state: BlockState) {
        let _ = self
            .commands
            .send(TrackerCommand::IrreversibleBlock(block_state));
    }

    pub fn track(&self, id: TransactionId) {
        let _ = self.commands.send(TrackerCommand::Track(id));
    }

    /// Submit a wait request body and resolve when the tracker replies,
    /// immediately or via a parked continuation. A dead tracker task
    /// degrades to a generic 500 body so the HTTP request never hangs.
    pub async fn wait_transaction(&self, body: String) -> (u16, Value) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cb: WaitCallback = Box::new(move |status, value| {
            // The receiver may be dropped before the sender (client
            // connection went away); we ignore the error in that case.
            let _ = reply_tx.send((status, value));
        });

        if self
            .commands
            .send(TrackerCommand::Wait { body, cb })
            .is_err()
        {
            return tracker_unavailable();
        }

        match reply_rx.await {
            Ok(reply) => reply,
            Err(_) => tracker_unavailable(),
        }
    }
}

fn tracker_unavailable() -> (u16, Value) {
    (
        500,
        ErrorResponse::new(500, "wait_transaction", "transaction tracker is unavailable").to_value(),
    )
}

/// Spawn the task owning `tracker` and return the handle to talk to it.
pub fn spawn_tracker<T>(mut tracker: T, metrics: Arc<NodeMetrics>) -> (TrackerHandle, JoinHandle<()>)
where
    T: TransactionTracker + 'static,
{
    let (commands, mut receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        while let Some(command) = receiver.recv().await {
            match command {
                TrackerCommand::AcceptedBlock(block_state) => {
                    debug!(block_num = block_state.block_num(), "accepted block");
                    tracker.on_accepted_block(&block_state);
                    metrics.accepted_blocks.inc();
                }
                TrackerCommand::IrreversibleBlock(block_state) => {
                    debug!(block_num = block_state.block_num(), "irreversible block");
                    let expired = tracker.on_irreversible_block(&block_state);
                    metrics.irreversible_blocks.inc();
                    metrics.expired_transactions.inc_by(expired as u64);
                    metrics
                        .last_irreversible_slot
                        .set(tracker.current_lib_slot() as i64);
                }
                TrackerCommand::Wait { body, cb } => {
                    tracker.handle_wait_transaction_request(&body, cb);
                }
                TrackerCommand::Track(id) => {
                    tracker.add(id);
                }
            }
            metrics
                .tracked_transactions
                .set(tracker.tracked_count() as i64);
        }
        info!("tracker task stopped");
    });

    (TrackerHandle { commands }, task)
}
