// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface of the service: transaction submission and wait endpoints.

use crate::metrics::NodeMetrics;
use crate::submission::SubmitKind;
use crate::tracker::types::ErrorResponse;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub mod handler;

#[cfg(test)]
pub(crate) mod mock_handler;

use self::handler::{ApiResponse, ChainApiHandlerTrait};

pub const APPLICATION_JSON: &str = "application/json";

pub const PUSH_TRANSACTION_PATH: &str = "/v2/chain/push_transaction";
pub const SEND_TRANSACTION_PATH: &str = "/v2/chain/send_transaction";
pub const WAIT_TRANSACTION_PATH: &str = "/v2/chain/wait_transaction";

pub fn run_server(
    socket_address: &SocketAddr,
    handler: impl ChainApiHandlerTrait + Send + Sync + 'static,
    metrics: Arc<NodeMetrics>,
) -> tokio::task::JoinHandle<()> {
    let socket_address = *socket_address;
    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(socket_address).await.unwrap();
        info!("API server listening on {}", socket_address);
        axum::serve(
            listener,
            make_router(Arc::new(handler), metrics).into_make_service(),
        )
        .await
        .unwrap();
    })
}

pub(crate) fn make_router(
    handler: Arc<impl ChainApiHandlerTrait + Sync + Send + 'static>,
    metrics: Arc<NodeMetrics>,
) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route(PUSH_TRANSACTION_PATH, post(push_transaction))
        .route(SEND_TRANSACTION_PATH, post(send_transaction))
        .route(WAIT_TRANSACTION_PATH, post(wait_transaction))
        .with_state((handler, metrics))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn push_transaction(
    State((handler, metrics)): State<(
        Arc<impl ChainApiHandlerTrait + Sync + Send + 'static>,
        Arc<NodeMetrics>,
    )>,
    body: String,
) -> ApiResponse {
    dispatch("push_transaction", metrics, async move {
        handler
            .handle_transaction_request(SubmitKind::Push, body)
            .await
    })
    .await
}

async fn send_transaction(
    State((handler, metrics)): State<(
        Arc<impl ChainApiHandlerTrait + Sync + Send + 'static>,
        Arc<NodeMetrics>,
    )>,
    body: String,
) -> ApiResponse {
    dispatch("send_transaction", metrics, async move {
        handler
            .handle_transaction_request(SubmitKind::Send, body)
            .await
    })
    .await
}

async fn wait_transaction(
    State((handler, metrics)): State<(
        Arc<impl ChainApiHandlerTrait + Sync + Send + 'static>,
        Arc<NodeMetrics>,
    )>,
    body: String,
) -> ApiResponse {
    let wait_metrics = metrics.clone();
    let response = dispatch("wait_transaction", metrics, async move {
        handler.handle_wait_transaction(body).await
    })
    .await;
    wait_metrics
        .wait_responses
        .with_label_values(&[response.0.as_str()])
        .inc();
    response
}

/// Run the endpoint's work in its own task so that a panic degrades to a
/// generic 500 error body instead of a hung request, and account the
/// outcome.
async fn dispatch<F>(endpoint: &'static str, metrics: Arc<NodeMetrics>, work: F) -> ApiResponse
where
    F: Future<Output = ApiResponse> + Send + 'static,
{
    metrics.requests_received.with_label_values(&[endpoint]).inc();

    let (status, body) = match tokio::spawn(work).await {
        Ok(response) => response,
        Err(err) => {
            error!(endpoint, ?err, "request handler aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    ErrorResponse::new(500, endpoint, "internal error while serving request")
                        .to_value(),
                ),
            )
        }
    };

    if status.is_client_error() || status.is_server_error() {
        metrics.err_requests.with_label_values(&[endpoint]).inc();
    } else {
        metrics.requests_ok.with_label_values(&[endpoint]).inc();
    }
    (status, body)
}
