// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transaction wait tracking.
//!
//! The tracker bridges the controller's block feed to held-open wait
//! requests: each tracked transaction couples the strongest condition
//! observed so far (accepted, finalized) with at most one parked HTTP
//! continuation, and expires against the last-irreversible slot. Two
//! policies share the spine: [`GlobalTracker`] admits every transaction the
//! node observes, [`LocalTracker`] only ids explicitly added after local
//! submission.
//!
//! All state lives behind a single task (see [`service`]); nothing here is
//! locked or shared.

mod store;
pub mod types;

pub mod service;

pub use self::store::TrackedStore;

use self::types::{ErrorResponse, TxCondition, WaitCallback, WaitTransactionParams};
use crate::chain::{BlockState, Transaction, TransactionId, TransactionReceipt};
use tracing::{debug, info};

/// Default retention, in seconds past the last irreversible block.
pub const DEFAULT_SECONDS_PAST_LIB: u32 = 600;

/// State shared by both tracking policies.
pub struct TrackerCore {
    pub tracked: TrackedStore,
    /// Slot of the last irreversible block. `0` until the first
    /// irreversible block is observed; expiration slots recorded in that
    /// window are relative offsets.
    pub lib_slot: u32,
    /// How long a record is kept past its last irreversible stamping, in
    /// slots (half seconds).
    pub num_slots_pass_lib: u32,
}

impl TrackerCore {
    pub fn new(seconds_past_lib: u32) -> Self {
        TrackerCore {
            tracked: TrackedStore::new(),
            lib_slot: 0,
            num_slots_pass_lib: seconds_past_lib.saturating_mul(2),
        }
    }

    /// Reap every record whose expiration slot is at or below `lib_slot`,
    /// firing their timeout replies.
    pub fn clear_expired(&mut self, lib_slot: u32) -> usize {
        let expired = self.tracked.erase_expired(lib_slot);
        if expired > 0 {
            info!(expired, lib_slot, "reaped expired tracked transactions");
        }
        expired
    }
}

/// The tracker state machine.
///
/// Provided methods carry the behavior both policies share: wait-request
/// validation, block-event iteration, the relative-to-absolute expiration
/// rewrite on first irreversibility, and reaping. Implementations decide
/// admission (who gets a record) and deadline stamping.
pub trait TransactionTracker: Send {
    fn core(&self) -> &TrackerCore;

    fn core_mut(&mut self) -> &mut TrackerCore;

    /// Admit an explicitly submitted transaction id. Only the local policy
    /// acts on this.
    fn add(&mut self, _id: TransactionId) {}

    /// Record that `trx` reached `status` in block `block_num`.
    fn set_tracked_transaction(&mut self, status: TxCondition, block_num: u32, trx: &Transaction);

    /// Register a validated wait request.
    fn on_wait_request(
        &mut self,
        transaction_id: TransactionId,
        condition: TxCondition,
        timeout_secs: u32,
        cb: WaitCallback,
    );

    /// Entry point for the HTTP layer: parse and validate the request body,
    /// then hand off to the policy. Every path replies through `cb` exactly
    /// once (either here or later, via the parked continuation).
    fn handle_wait_transaction_request(&mut self, body: &str, cb: WaitCallback) {
        let params: WaitTransactionParams = match serde_json::from_str(body) {
            Ok(params) => params,
            Err(err) => {
                cb(
                    422,
                    ErrorResponse::new(
                        422,
                        "handle_wait_transaction_request",
                        format!("malformed wait_transaction request: {err}"),
                    )
                    .to_value(),
                );
                return;
            }
        };

        let condition = TxCondition::parse(&params.condition);
        if params.transaction_id.is_zero() {
            cb(
                422,
                ErrorResponse::new(422, "handle_wait_transaction_request", "invalid transaction_id")
                    .to_value(),
            );
        } else if condition == TxCondition::Invalid {
            cb(
                422,
                ErrorResponse::new(
                    422,
                    "handle_wait_transaction_request",
                    "condition must be 'accepted' or 'finalized'",
                )
                .to_value(),
            );
        } else {
            self.on_wait_request(params.transaction_id, condition, params.timeout, cb);
        }
    }

    /// Dispatch every bodied receipt of a block to the policy. Bare-id
    /// receipts are skipped: they carry no `ref_block_*` fields to answer
    /// a wait with.
    fn on_block(&mut self, status: TxCondition, block_state: &BlockState) {
        for receipt in &block_state.block.transactions {
            let TransactionReceipt::PackedTransaction(trx) = receipt else {
                continue;
            };
            self.set_tracked_transaction(status, block_state.block_num(), trx);
        }
    }

    fn on_accepted_block(&mut self, block_state: &BlockState) {
        if self.core().lib_slot == 0 {
            // no reference frame for expiration slots yet
            debug!(
                block_num = block_state.block_num(),
                "dropping accepted block before first irreversible block"
            );
            return;
        }
        self.on_block(TxCondition::Accepted, block_state);
    }

    /// Advance irreversibility: absolutize relative expirations on the
    /// first event, stamp the new lib slot, dispatch the block's
    /// transactions as finalized, then reap. Returns the number of records
    /// reaped.
    fn on_irreversible_block(&mut self, block_state: &BlockState) -> usize {
        let start_slot = block_state.slot();
        if self.core().lib_slot == 0 {
            self.core_mut().tracked.absolutize_expirations(start_slot);
        }
        self.core_mut().lib_slot = start_slot;
        self.on_block(TxCondition::Finalized, block_state);
        self.core_mut().clear_expired(start_slot)
    }

    fn contains_transaction(&self, id: &TransactionId) -> bool {
        self.core().tracked.contains(id)
    }

    fn transaction_expiration_slot(&self, id: &TransactionId) -> Option<u32> {
        self.core().tracked.expiration_slot(id)
    }

    fn current_lib_slot(&self) -> u32 {
        self.core().lib_slot
    }

    fn tracked_count(&self) -> usize {
        self.core().tracked.len()
    }
}

/// Tracks every transaction the node observes.
///
/// A wait on a transaction not yet seen parks until the transaction shows
/// up in an accepted or irreversible block within the request's timeout
/// window; a wait after the fact is answered immediately. Useful for
/// read-only observers that must answer wait queries for arbitrary traffic.
pub struct GlobalTracker {
    core: TrackerCore,
}

impl GlobalTracker {
    pub fn new(seconds_past_lib: u32) -> Self {
        GlobalTracker {
            core: TrackerCore::new(seconds_past_lib),
        }
    }
}

impl Default for GlobalTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SECONDS_PAST_LIB)
    }
}

impl TransactionTracker for GlobalTracker {
    fn core(&self) -> &TrackerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackerCore {
        &mut self.core
    }

    fn set_tracked_transaction(&mut self, status: TxCondition, block_num: u32, trx: &Transaction) {
        let expiration_slot = self.core.lib_slot.saturating_add(self.core.num_slots_pass_lib);

        self.core.tracked.insert_or_get(trx.id, 0);
        self.core.tracked.modify(&trx.id, |tracked| {
            if status == TxCondition::Finalized || !tracked.has_pending_wait() {
                // do not shorten a pending wait's deadline on accepted
                tracked.expiration_slot = expiration_slot;
            }
            tracked.on_block(status, block_num, trx);
        });
    }

    fn on_wait_request(
        &mut self,
        transaction_id: TransactionId,
        condition: TxCondition,
        timeout_secs: u32,
        cb: WaitCallback,
    ) {
        // seconds to slots; relative to lib, which may still be the 0
        // sentinel (absolutized on the first irreversible block)
        let expiration_slot = self
            .core
            .lib_slot
            .saturating_add(timeout_secs.saturating_mul(2));

        self.core.tracked.insert_or_get(transaction_id, 0);
        self.core.tracked.modify(&transaction_id, |tracked| {
            if tracked.expiration_slot == 0 {
                tracked.expiration_slot = expiration_slot;
            }
            tracked.on_wait_request(condition, cb);
        });
    }
}

/// Tracks only transactions submitted through this node.
///
/// Ids become trackable via [`TransactionTracker::add`] after a successful
/// submission and stay trackable for `num_slots_pass_lib` slots from
/// admission; the wait request's `timeout` field has no effect. A wait on
/// an id that was never added (or already reaped) is answered 404.
pub struct LocalTracker {
    core: TrackerCore,
}

impl LocalTracker {
    pub fn new(seconds_past_lib: u32) -> Self {
        LocalTracker {
            core: TrackerCore::new(seconds_past_lib),
        }
    }
}

impl Default for LocalTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SECONDS_PAST_LIB)
    }
}

impl TransactionTracker for LocalTracker {
    fn core(&self) -> &TrackerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TrackerCore {
        &mut self.core
    }

    fn add(&mut self, id: TransactionId) {
        let expiration_slot = self.core.lib_slot.saturating_add(self.core.num_slots_pass_lib);
        self.core.tracked.insert_or_get(id, expiration_slot);
        debug!(transaction_id = %id, expiration_slot, "tracking submitted transaction");
    }

    fn set_tracked_transaction(&mut self, status: TxCondition, block_num: u32, trx: &Transaction) {
        // the deadline was fixed at admission; only dispatch the event
        self.core.tracked.modify(&trx.id, |tracked| {
            tracked.on_block(status, block_num, trx);
        });
    }

    fn on_wait_request(
        &mut self,
        transaction_id: TransactionId,
        condition: TxCondition,
        _timeout_secs: u32,
        cb: WaitCallback,
    ) {
        if !self.core.tracked.contains(&transaction_id) {
            cb(
                404,
                ErrorResponse::new(
                    404,
                    "on_wait_request",
                    "the specified transaction is not currently tracked",
                )
                .to_value(),
            );
            return;
        }

        self.core.tracked.modify(&transaction_id, |tracked| {
            tracked.on_wait_request(condition, cb);
        });
    }
}
