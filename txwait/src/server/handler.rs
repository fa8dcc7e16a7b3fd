// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chain::ChainClient;
use crate::error::ChainClientError;
use crate::submission::{SubmissionBridge, SubmitKind};
use crate::tracker::service::TrackerHandle;
use crate::tracker::types::ErrorResponse;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

pub type ApiResponse = (StatusCode, Json<Value>);

#[async_trait]
pub trait ChainApiHandlerTrait {
    // Handles a push_transaction/send_transaction request: forwards the
    // body to the chain controller and, on success, registers the returned
    // id with the tracker before replying 202.
    async fn handle_transaction_request(&self, kind: SubmitKind, body: String) -> ApiResponse;

    // Handles a wait_transaction request. The response may be deferred
    // until a block event or expiration resolves the wait.
    async fn handle_wait_transaction(&self, body: String) -> ApiResponse;
}

pub struct ChainApiHandler<C> {
    bridge: SubmissionBridge<C>,
    tracker: TrackerHandle,
}

impl<C: ChainClient> ChainApiHandler<C> {
    pub fn new(client: Arc<C>, tracker: TrackerHandle) -> Self {
        ChainApiHandler {
            bridge: SubmissionBridge::new(client, tracker.clone()),
            tracker,
        }
    }
}

#[async_trait]
impl<C: ChainClient + 'static> ChainApiHandlerTrait for ChainApiHandler<C> {
    async fn handle_transaction_request(&self, kind: SubmitKind, body: String) -> ApiResponse {
        let params: Value = match serde_json::from_str(&body) {
            Ok(params) => params,
            Err(err) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(
                        ErrorResponse::new(
                            422,
                            kind.action(),
                            format!("malformed {} request: {err}", kind.action()),
                        )
                        .to_value(),
                    ),
                );
            }
        };

        match self.bridge.submit(kind, params).await {
            Ok(results) => (
                StatusCode::ACCEPTED,
                Json(serde_json::to_value(&results).expect("submit results are serializable")),
            ),
            Err(err) => chain_error_response(kind.action(), err),
        }
    }

    async fn handle_wait_transaction(&self, body: String) -> ApiResponse {
        let (status, value) = self.tracker.wait_transaction(body).await;
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(value),
        )
    }
}

/// Submission failures keep the controller's own status code when it
/// answered, and degrade to 500 otherwise.
fn chain_error_response(method: &str, err: ChainClientError) -> ApiResponse {
    let (code, message) = match err {
        ChainClientError::Status { code, message } => (code, message),
        other => (500, other.to_string()),
    };
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse::new(status.as_u16(), method, message).to_value()),
    )
}
