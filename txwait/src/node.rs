// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chain::ChainClient;
use crate::chain_client::HttpChainClient;
use crate::chain_sync::ChainSyncer;
use crate::config::{NodeConfig, TrackerMode};
use crate::metrics::NodeMetrics;
use crate::server::handler::ChainApiHandler;
use crate::server::run_server;
use crate::tracker::service::spawn_tracker;
use crate::tracker::{GlobalTracker, LocalTracker};
use anyhow::anyhow;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Handles to the running node's tasks.
pub struct NodeHandle {
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl NodeHandle {
    pub async fn join(self) -> anyhow::Result<()> {
        for task in self.tasks {
            task.await.map_err(|err| anyhow!("task join error: {err}"))?;
        }
        Ok(())
    }

    /// Ask the block syncer to stop. The API server keeps serving until the
    /// process exits.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

pub async fn run_node(
    config: NodeConfig,
    prometheus_registry: prometheus::Registry,
) -> anyhow::Result<NodeHandle> {
    let metrics = Arc::new(NodeMetrics::new(&prometheus_registry));
    let client = Arc::new(HttpChainClient::new(&config.chain.chain_rpc_url));

    let chain_info = client.get_info().await.map_err(|err| {
        anyhow!(
            "failed to reach chain controller at {}: {err}",
            config.chain.chain_rpc_url
        )
    })?;
    info!(
        head = chain_info.head_block_num,
        lib = chain_info.last_irreversible_block_num,
        mode = ?config.tracker.mode,
        "connected to chain controller"
    );

    let (tracker_handle, tracker_task) = match config.tracker.mode {
        TrackerMode::Global => spawn_tracker(
            GlobalTracker::new(config.tracker.seconds_past_lib),
            metrics.clone(),
        ),
        TrackerMode::Local => spawn_tracker(
            LocalTracker::new(config.tracker.seconds_past_lib),
            metrics.clone(),
        ),
    };

    let cancel = CancellationToken::new();
    let syncer_task = ChainSyncer::new(
        client.clone(),
        tracker_handle.clone(),
        Duration::from_millis(config.chain.poll_interval_ms),
    )
    .spawn(cancel.clone());

    let socket_address = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
        config.server_listen_port,
    );
    let server_task = run_server(
        &socket_address,
        ChainApiHandler::new(client, tracker_handle),
        metrics,
    );

    Ok(NodeHandle {
        tasks: vec![tracker_task, syncer_task, server_task],
        cancel,
    })
}
