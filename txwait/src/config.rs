// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::tracker::DEFAULT_SECONDS_PAST_LIB;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use txwait_config::Config;

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    // HTTP endpoint of the chain controller's API.
    pub chain_rpc_url: String,
    // How often to poll the controller for new blocks, in milliseconds.
    // The default is one slot.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Which transactions the node tracks for wait requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerMode {
    // Track every transaction observed in blocks.
    #[default]
    Global,
    // Track only transactions submitted through this node.
    Local,
}

#[serde_as]
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    #[serde(default)]
    pub mode: TrackerMode,
    // Retention past the last irreversible block, in seconds.
    #[serde(default = "default_seconds_past_lib")]
    pub seconds_past_lib: u32,
}

fn default_seconds_past_lib() -> u32 {
    DEFAULT_SECONDS_PAST_LIB
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            mode: TrackerMode::default(),
            seconds_past_lib: default_seconds_past_lib(),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeConfig {
    // The port that the API server listens on.
    pub server_listen_port: u16,
    // The port for the metrics server.
    pub metrics_port: u16,
    // Chain controller connection
    pub chain: ChainConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl Config for NodeConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let raw = r#"
server-listen-port: 8889
metrics-port: 9185
chain:
  chain-rpc-url: "http://127.0.0.1:8888"
  poll-interval-ms: 250
tracker:
  mode: local
  seconds-past-lib: 120
"#;
        let config: NodeConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.server_listen_port, 8889);
        assert_eq!(config.chain.poll_interval_ms, 250);
        assert_eq!(config.tracker.mode, TrackerMode::Local);
        assert_eq!(config.tracker.seconds_past_lib, 120);
    }

    #[test]
    fn test_defaults_apply() {
        let raw = r#"
server-listen-port: 8889
metrics-port: 9185
chain:
  chain-rpc-url: "http://127.0.0.1:8888"
"#;
        let config: NodeConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.chain.poll_interval_ms, 500);
        assert_eq!(config.tracker.mode, TrackerMode::Global);
        assert_eq!(config.tracker.seconds_past_lib, DEFAULT_SECONDS_PAST_LIB);
    }
}
