// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the chain controller's API.
//!
//! The controller exposes plain JSON-over-POST endpoints under `/v1/chain/`:
//! `get_info`, `get_block`, `push_transaction`, `send_transaction`.

use crate::chain::{BlockState, ChainClient, ChainInfo, PushTransactionResults};
use crate::error::{ChainClientError, ChainResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct HttpChainClient {
    http_client: reqwest::Client,
    base_url: String,
}

fn shared_http_client() -> reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            // Pooling stays enabled; timeouts are tuned for a controller on
            // the same host or rack.
            reqwest::Client::builder()
                .pool_max_idle_per_host(16)
                .tcp_keepalive(Some(Duration::from_secs(30)))
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build reqwest client")
        })
        .clone()
}

impl HttpChainClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http_client: shared_http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call(&self, endpoint: &str, params: Value) -> ChainResult<Value> {
        let url = format!("{}/v1/chain/{}", self.base_url, endpoint);
        let response = self.http_client.post(&url).json(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChainClientError::Status {
                code: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|err| ChainClientError::Response(err.to_string()))
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> ChainResult<T> {
        serde_json::from_value(value).map_err(|err| ChainClientError::Response(err.to_string()))
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_info(&self) -> ChainResult<ChainInfo> {
        Self::decode(self.call("get_info", json!({})).await?)
    }

    async fn get_block(&self, block_num: u32) -> ChainResult<BlockState> {
        Self::decode(
            self.call("get_block", json!({ "block_num": block_num }))
                .await?,
        )
    }

    async fn push_transaction(&self, params: Value) -> ChainResult<PushTransactionResults> {
        Self::decode(self.call("push_transaction", params).await?)
    }

    async fn send_transaction(&self, params: Value) -> ChainResult<PushTransactionResults> {
        Self::decode(self.call("send_transaction", params).await?)
    }
}
