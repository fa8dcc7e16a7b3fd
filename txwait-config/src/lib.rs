// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Config loading shared by the txwait binaries.

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Load/save helper for on-disk config files.
///
/// YAML and JSON are both accepted on load, keyed off the file extension.
pub trait Config: Serialize + DeserializeOwned {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|s| s.to_str());
        let config: Self = if extension == Some("yaml") || extension == Some("yml") {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

pub mod local_ip_utils {
    use std::net::{IpAddr, SocketAddr, TcpListener};

    // Get a random available port by binding to port 0 and letting OS assign
    pub fn get_available_port(host: &IpAddr) -> u16 {
        let socket_addr = SocketAddr::new(*host, 0);
        let listener = TcpListener::bind(socket_addr).expect("Failed to bind to random port");
        listener
            .local_addr()
            .expect("Failed to get local address")
            .port()
    }

    // Testing helper
    pub fn localhost_for_testing() -> IpAddr {
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    }
}
