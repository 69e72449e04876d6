// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Provides a simple way of reading configuration files.
//!
//! Reads a TOML config file for the approval daemon and deserializes it in a type-safe way into a
//! [`Config`] struct.


use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use url::Url;

use crate::topology::Topology;

pub const JSON_RPC_ENDPOINT: &str = "json_rpc";
pub const JSON_RPC_VERSION: &str = "2.0";
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 10;

pub mod json_rpc_methods {
    pub const PROPOSE: &str = "propose";
    pub const REPLY: &str = "reply";
    pub const LIST_VOTES: &str = "list_votes";
    pub const VOTE_DETAIL: &str = "vote_detail";
    pub const SYNC: &str = "sync";
}

/// The top-level struct representing the config. Calls to [`Config::from_file`] deserialize into
/// this struct.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub server: Server,
    pub topology: TopologyConfig,
    #[serde(default)]
    pub participants: HashMap<String, ParticipantConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Server {
    pub json_rpc_address: SocketAddr,
}

/// Where this process sits in the federation.
#[derive(Deserialize, Debug, Clone)]
pub struct TopologyConfig {
    pub mode: Topology,
    /// The identity of the caller in this process.
    pub local_participant: String,
    /// The hub replies are forwarded to, participant mode only.
    pub hub: Option<String>,
    /// Participants hosted by this process.
    #[serde(default)]
    pub embedded: Vec<String>,
    /// Participants that cannot hold a signing key.
    #[serde(default)]
    pub non_signing: Vec<String>,
}

/// A remote participant or hub.
#[derive(Deserialize, Debug, Clone)]
pub struct ParticipantConfig {
    pub endpoint: Url,
    /// Set when the participant is embedded in a hub, pushes then go to the hub.
    pub hub: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SyncConfig {
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StoreConfig {
    /// Votes are kept in memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

impl Config {
    /// Reads a TOML configuration in the `s` string and returns a [`Config`] struct.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML configuration file specified in the `path` and returns a [`Config`] struct.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Config::from_toml_str(contents.as_str())
    }

    pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        Config::from_toml_str(contents.as_str())
    }

    fn validate(&self) -> Result<()> {
        let topology = &self.topology;
        if topology.local_participant.is_empty() {
            return Err(anyhow!("topology.local_participant must not be empty"));
        }

        if topology.mode == Topology::Participant {
            let hub = topology
                .hub
                .as_ref()
                .ok_or_else(|| anyhow!("participant mode requires topology.hub"))?;
            if !self.participants.contains_key(hub) {
                return Err(anyhow!("hub {hub} has no endpoint in participants"));
            }
        }

        for (id, p) in self.participants.iter() {
            if let Some(hub) = &p.hub {
                if hub != &topology.local_participant && !self.participants.contains_key(hub) {
                    return Err(anyhow!("participant {id} refers to unknown hub {hub}"));
                }
            }
        }

        Ok(())
    }
}
