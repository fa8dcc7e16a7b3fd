// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Turns the controller's advancing head/irreversible block numbers into
//! ordered block-event deliveries for the tracker.
//!
//! The controller pushes nothing; this task polls `get_info` and fetches
//! every block the head and last-irreversible cursors advanced over,
//! delivering each exactly once and in order. Transient RPC failures are
//! retried with backoff; a failure mid-range simply leaves the cursor in
//! place for the next tick.

use crate::chain::{BlockState, ChainClient, ChainInfo};
use crate::retry_with_max_elapsed_time;
use crate::tracker::service::TrackerHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const RETRY_MAX_ELAPSED: Duration = Duration::from_secs(15);

struct Cursor {
    head: u32,
    lib: u32,
}

pub struct ChainSyncer<C> {
    client: Arc<C>,
    tracker: TrackerHandle,
    poll_interval: Duration,
}

impl<C: ChainClient + 'static> ChainSyncer<C> {
    pub fn new(client: Arc<C>, tracker: TrackerHandle, poll_interval: Duration) -> Self {
        ChainSyncer {
            client,
            tracker,
            poll_interval,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cursor: Option<Cursor> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("chain syncer stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            let Some(chain_info) = self.get_info().await else {
                continue;
            };

            let mut cur = match cursor.take() {
                Some(cur) => cur,
                None => {
                    // Seed the tracker's reference frame with the current
                    // irreversible block before streaming new ones.
                    if chain_info.last_irreversible_block_num > 0 {
                        let Some(block) = self
                            .fetch_block(chain_info.last_irreversible_block_num)
                            .await
                        else {
                            continue;
                        };
                        self.tracker.irreversible_block(block);
                    }
                    info!(
                        head = chain_info.head_block_num,
                        lib = chain_info.last_irreversible_block_num,
                        "chain syncer started"
                    );
                    Cursor {
                        head: chain_info.head_block_num,
                        lib: chain_info.last_irreversible_block_num,
                    }
                }
            };

            while cur.head < chain_info.head_block_num {
                let Some(block) = self.fetch_block(cur.head + 1).await else {
                    break;
                };
                self.tracker.accepted_block(block);
                cur.head += 1;
            }
            while cur.lib < chain_info.last_irreversible_block_num {
                let Some(block) = self.fetch_block(cur.lib + 1).await else {
                    break;
                };
                self.tracker.irreversible_block(block);
                cur.lib += 1;
            }
            cursor = Some(cur);
        }
    }

    async fn get_info(&self) -> Option<ChainInfo> {
        match retry_with_max_elapsed_time!(self.client.get_info(), RETRY_MAX_ELAPSED) {
            Ok(Ok(chain_info)) => Some(chain_info),
            Ok(Err(err)) | Err(err) => {
                warn!(%err, "failed to fetch chain info");
                None
            }
        }
    }

    async fn fetch_block(&self, block_num: u32) -> Option<BlockState> {
        match retry_with_max_elapsed_time!(self.client.get_block(block_num), RETRY_MAX_ELAPSED) {
            Ok(Ok(block)) => Some(block),
            Ok(Err(err)) | Err(err) => {
                warn!(block_num, %err, "failed to fetch block");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NodeMetrics;
    use crate::mock_chain_client::MockChainClient;
    use crate::test_utils::{make_block_state, packed, tid, wait_body};
    use crate::tracker::service::spawn_tracker;
    use crate::tracker::GlobalTracker;

    #[tokio::test]
    async fn test_syncer_streams_blocks_to_tracker() {
        let client = MockChainClient::new();
        client.add_block(make_block_state(500, 1000, vec![]));
        client.set_info(500, 500);

        let (handle, _tracker_task) = spawn_tracker(
            GlobalTracker::default(),
            Arc::new(NodeMetrics::new_for_testing()),
        );
        let cancel = CancellationToken::new();
        let sync_task = ChainSyncer::new(
            Arc::new(client.clone()),
            handle.clone(),
            Duration::from_millis(10),
        )
        .spawn(cancel.clone());

        // first tick seeds the reference frame from the current LIB
        tokio::time::sleep(Duration::from_millis(100)).await;

        client.add_block(make_block_state(501, 1001, vec![packed(100, 11, 22)]));
        client.set_info(501, 500);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (status, body) = handle
            .wait_transaction(wait_body(tid(100), "accepted", 180))
            .await;
        assert_eq!(status, 202);
        assert_eq!(body["block_num"], 501);

        // irreversibility advances over the same block
        client.set_info(501, 501);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (status, body) = handle
            .wait_transaction(wait_body(tid(100), "finalized", 180))
            .await;
        assert_eq!(status, 201);
        assert_eq!(body["block_num"], 501);

        cancel.cancel();
        sync_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_syncer_stops_on_cancellation() {
        let client = MockChainClient::new();
        let (handle, _tracker_task) = spawn_tracker(
            GlobalTracker::default(),
            Arc::new(NodeMetrics::new_for_testing()),
        );
        let cancel = CancellationToken::new();
        let sync_task =
            ChainSyncer::new(Arc::new(client), handle, Duration::from_millis(10)).spawn(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), sync_task)
            .await
            .expect("syncer should stop promptly")
            .unwrap();
    }
}
