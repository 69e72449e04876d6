// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The deployment topology of the local process.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use strum::Display;
use url::Url;

use crate::config::{Config, ParticipantConfig};

/// Who is authoritative for the state of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Topology {
    /// Hosts its embedded participants and commits their replies directly.
    Hub,
    /// An edge operator; replies are forwarded to its hub.
    Participant,
    /// No hub; every participant keeps its own store and fans replies out to the others.
    Autonomy,
}

/// Answers where participants live relative to the local process.
pub trait TopologyOracle: Send + Sync {
    fn mode(&self) -> Topology;

    /// The identity of callers of this process.
    fn local_participant(&self) -> &str;

    /// Whether `participant` is co-located with the local process.
    fn is_embedded(&self, participant: &str) -> bool;

    /// The hub hosting a remote `participant`, if any.
    fn hub_of(&self, participant: &str) -> Option<&str>;

    /// The hub this process forwards to, participant mode only.
    fn hub(&self) -> Option<&str>;

    /// The ingress of a remote participant or hub.
    fn endpoint(&self, participant: &str) -> Option<&Url>;

    /// Whether `participant` can hold a signing key.
    fn can_sign(&self, participant: &str) -> bool;
}

/// A [`TopologyOracle`] fixed at construction, usually from [`Config`].
#[derive(Debug, Clone)]
pub struct StaticTopology {
    mode: Topology,
    local_participant: String,
    hub: Option<String>,
    embedded: HashSet<String>,
    non_signing: HashSet<String>,
    participants: HashMap<String, ParticipantConfig>,
}

impl StaticTopology {
    pub fn new(mode: Topology, local_participant: &str) -> Self {
        Self {
            mode,
            local_participant: local_participant.to_string(),
            hub: None,
            embedded: HashSet::new(),
            non_signing: HashSet::new(),
            participants: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let t = &config.topology;
        Self {
            mode: t.mode,
            local_participant: t.local_participant.clone(),
            hub: t.hub.clone(),
            embedded: t.embedded.iter().cloned().collect(),
            non_signing: t.non_signing.iter().cloned().collect(),
            participants: config.participants.clone(),
        }
    }

    pub fn with_hub(mut self, hub: &str) -> Self {
        self.hub = Some(hub.to_string());
        self
    }

    pub fn with_embedded(mut self, participant: &str) -> Self {
        self.embedded.insert(participant.to_string());
        self
    }

    pub fn with_non_signing(mut self, participant: &str) -> Self {
        self.non_signing.insert(participant.to_string());
        self
    }

    pub fn with_participant(mut self, participant: &str, endpoint: Url, hub: Option<&str>) -> Self {
        self.participants.insert(
            participant.to_string(),
            ParticipantConfig {
                endpoint,
                hub: hub.map(str::to_string),
            },
        );
        self
    }
}

impl TopologyOracle for StaticTopology {
    fn mode(&self) -> Topology {
        self.mode
    }

    fn local_participant(&self) -> &str {
        &self.local_participant
    }

    fn is_embedded(&self, participant: &str) -> bool {
        participant == self.local_participant
            || self.embedded.contains(participant)
            || self
                .participants
                .get(participant)
                .and_then(|p| p.hub.as_deref())
                .map_or(false, |hub| hub == self.local_participant)
    }

    fn hub_of(&self, participant: &str) -> Option<&str> {
        if self.is_embedded(participant) {
            return None;
        }
        self.participants
            .get(participant)
            .and_then(|p| p.hub.as_deref())
    }

    fn hub(&self) -> Option<&str> {
        self.hub.as_deref()
    }

    fn endpoint(&self, participant: &str) -> Option<&Url> {
        self.participants.get(participant).map(|p| &p.endpoint)
    }

    fn can_sign(&self, participant: &str) -> bool {
        !self.non_signing.contains(participant)
    }
}
