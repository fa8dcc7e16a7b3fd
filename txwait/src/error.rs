// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Result type for chain controller access
pub type ChainResult<T> = Result<T, ChainClientError>;

/// Errors surfaced by the chain controller client
#[derive(Debug, Clone, Error)]
pub enum ChainClientError {
    /// The request never produced an HTTP response
    #[error("transport error: {0}")]
    Transport(String),

    /// The controller answered with an error status. The code is forwarded
    /// verbatim to API clients for submission failures.
    #[error("chain controller returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The controller answered 2xx but the body did not decode
    #[error("malformed controller response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for ChainClientError {
    fn from(err: reqwest::Error) -> Self {
        ChainClientError::Transport(err.to_string())
    }
}
