// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock implementation for `ChainApiHandlerTrait` that replies with
//! preset responses.

use super::handler::{ApiResponse, ChainApiHandlerTrait};
use super::make_router;
use crate::metrics::NodeMetrics;
use crate::submission::SubmitKind;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockChainApiHandler {
    transaction_responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
    wait_responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
}

impl MockChainApiHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction_response(&self, status: u16, body: Value) {
        self.transaction_responses
            .lock()
            .unwrap()
            .push_back((status, body));
    }

    pub fn add_wait_response(&self, status: u16, body: Value) {
        self.wait_responses.lock().unwrap().push_back((status, body));
    }

    fn pop(queue: &Mutex<VecDeque<(u16, Value)>>, endpoint: &str) -> ApiResponse {
        let (status, body) = queue
            .lock()
            .unwrap()
            .pop_front()
            // Ok to panic in test
            .unwrap_or_else(|| panic!("no preset response for {endpoint}"));
        (
            StatusCode::from_u16(status).expect("preset status is valid"),
            Json(body),
        )
    }
}

#[async_trait]
impl ChainApiHandlerTrait for MockChainApiHandler {
    async fn handle_transaction_request(&self, kind: SubmitKind, _body: String) -> ApiResponse {
        Self::pop(&self.transaction_responses, kind.action())
    }

    async fn handle_wait_transaction(&self, _body: String) -> ApiResponse {
        Self::pop(&self.wait_responses, "wait_transaction")
    }
}

pub fn run_mock_server(
    socket_address: SocketAddr,
    mock_handler: MockChainApiHandler,
) -> tokio::task::JoinHandle<()> {
    tracing::info!("Starting mock server at {}", socket_address);
    let listener = std::net::TcpListener::bind(socket_address).unwrap();
    listener.set_nonblocking(true).unwrap();
    let listener = tokio::net::TcpListener::from_std(listener).unwrap();
    tokio::spawn(async move {
        let router = make_router(
            Arc::new(mock_handler),
            Arc::new(NodeMetrics::new_for_testing()),
        );
        axum::serve(listener, router).await.unwrap()
    })
}
