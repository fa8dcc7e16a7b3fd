// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory store of tracked transactions, indexed two ways: unique by
//! transaction id, and ordered (non-unique) by expiration slot. The two
//! indices are kept in lockstep by [`TrackedStore::modify`], the only
//! mutation path that may change an entry's expiration slot.

use super::types::TrackedTransaction;
use crate::chain::TransactionId;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Default)]
pub struct TrackedStore {
    by_id: HashMap<TransactionId, TrackedTransaction>,
    by_expiration: BTreeSet<(u32, TransactionId)>,
}

impl TrackedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record unless the id is already tracked.
    ///
    /// Returns whether a record was inserted.
    pub fn insert_or_get(&mut self, id: TransactionId, expiration_slot: u32) -> bool {
        match self.by_id.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(TrackedTransaction::new(id, expiration_slot));
                self.by_expiration.insert((expiration_slot, id));
                true
            }
        }
    }

    /// Apply `f` to the record for `id` and re-index it if `f` moved the
    /// expiration slot. Both indices are consistent before this returns.
    ///
    /// Returns whether the id was found.
    pub fn modify<F>(&mut self, id: &TransactionId, f: F) -> bool
    where
        F: FnOnce(&mut TrackedTransaction),
    {
        let Some(tracked) = self.by_id.get_mut(id) else {
            return false;
        };
        let old_slot = tracked.expiration_slot;
        f(tracked);
        let new_slot = tracked.expiration_slot;
        if new_slot != old_slot {
            self.by_expiration.remove(&(old_slot, *id));
            self.by_expiration.insert((new_slot, *id));
        }
        true
    }

    pub fn get(&self, id: &TransactionId) -> Option<&TrackedTransaction> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn expiration_slot(&self, id: &TransactionId) -> Option<u32> {
        self.by_id.get(id).map(|tracked| tracked.expiration_slot)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Fire the expiration hook of every record with
    /// `expiration_slot <= slot`, in expiration order, and erase them.
    ///
    /// Returns the number of records erased.
    pub fn erase_expired(&mut self, slot: u32) -> usize {
        let expired = match slot.checked_add(1) {
            Some(bound) => {
                let not_expired = self.by_expiration.split_off(&(bound, TransactionId::default()));
                std::mem::replace(&mut self.by_expiration, not_expired)
            }
            None => std::mem::take(&mut self.by_expiration),
        };

        let count = expired.len();
        for (_, id) in expired {
            if let Some(mut tracked) = self.by_id.remove(&id) {
                tracked.on_expired();
            }
        }
        if count > 0 {
            debug!(count, slot, "erased expired tracked transactions");
        }
        count
    }

    /// Rewrite every record's expiration slot from a relative offset to an
    /// absolute slot. Runs once, on the first irreversible block.
    pub fn absolutize_expirations(&mut self, start_slot: u32) {
        for tracked in self.by_id.values_mut() {
            tracked.expiration_slot = tracked.expiration_slot.saturating_add(start_slot);
        }
        // every key moved by the same offset, rebuild the index wholesale
        self.by_expiration = self
            .by_id
            .values()
            .map(|tracked| (tracked.expiration_slot, tracked.id))
            .collect();
    }
}
