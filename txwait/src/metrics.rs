// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use axum::{routing::get, Router};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

#[derive(Clone, Debug)]
pub struct NodeMetrics {
    pub(crate) requests_received: IntCounterVec,
    pub(crate) requests_ok: IntCounterVec,
    pub(crate) err_requests: IntCounterVec,
    pub(crate) wait_responses: IntCounterVec,

    pub(crate) tracked_transactions: IntGauge,
    pub(crate) last_irreversible_slot: IntGauge,

    pub(crate) accepted_blocks: IntCounter,
    pub(crate) irreversible_blocks: IntCounter,
    pub(crate) expired_transactions: IntCounter,
}

impl NodeMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            requests_received: register_int_counter_vec_with_registry!(
                "txwait_requests_received",
                "Total number of API requests received, by endpoint",
                &["endpoint"],
                registry,
            )
            .unwrap(),
            requests_ok: register_int_counter_vec_with_registry!(
                "txwait_requests_ok",
                "Total number of successful API responses, by endpoint",
                &["endpoint"],
                registry,
            )
            .unwrap(),
            err_requests: register_int_counter_vec_with_registry!(
                "txwait_err_requests",
                "Total number of error API responses, by endpoint",
                &["endpoint"],
                registry,
            )
            .unwrap(),
            wait_responses: register_int_counter_vec_with_registry!(
                "txwait_wait_responses",
                "Total number of wait_transaction responses, by status code",
                &["status"],
                registry,
            )
            .unwrap(),
            tracked_transactions: register_int_gauge_with_registry!(
                "txwait_tracked_transactions",
                "Number of transactions currently tracked",
                registry,
            )
            .unwrap(),
            last_irreversible_slot: register_int_gauge_with_registry!(
                "txwait_last_irreversible_slot",
                "Slot of the last irreversible block observed",
                registry,
            )
            .unwrap(),
            accepted_blocks: register_int_counter_with_registry!(
                "txwait_accepted_blocks",
                "Total number of accepted block events processed",
                registry,
            )
            .unwrap(),
            irreversible_blocks: register_int_counter_with_registry!(
                "txwait_irreversible_blocks",
                "Total number of irreversible block events processed",
                registry,
            )
            .unwrap(),
            expired_transactions: register_int_counter_with_registry!(
                "txwait_expired_transactions",
                "Total number of tracked transactions reaped by expiration",
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        Self::new(&Registry::new())
    }
}

/// Serve the prometheus exposition format on `addr`.
pub fn start_metrics_server(addr: SocketAddr, registry: Registry) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let router = Router::new()
            .route("/metrics", get(serve_metrics))
            .with_state(registry);
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        info!("metrics server listening on {}", addr);
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    })
}

async fn serve_metrics(axum::extract::State(registry): axum::extract::State<Registry>) -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&registry.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        let registry = Registry::new();
        let metrics = NodeMetrics::new(&registry);
        metrics.requests_received.with_label_values(&["wait_transaction"]).inc();
        metrics.tracked_transactions.set(3);

        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "txwait_requests_received"));
        assert!(families.iter().any(|f| f.get_name() == "txwait_tracked_transactions"));
    }
}
