// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use anyhow::anyhow;
use approval_sdk::{ParticipantId, SyncPayload};
use futures_util::future::join_all;

use crate::sync::{Delivery, DeliveryRoute, DispatchReport, SyncApplier, SyncTransport};
use crate::topology::TopologyOracle;

/// Best-effort fan-out of sync payloads. Every destination is an independent attempt: a failed
/// delivery is logged and reported, never retried, and never affects the other destinations.
pub struct SyncDispatcher {
    topology: Arc<dyn TopologyOracle>,
    transport: Arc<dyn SyncTransport>,
    applier: Arc<SyncApplier>,
}

impl SyncDispatcher {
    pub fn new(
        topology: Arc<dyn TopologyOracle>,
        transport: Arc<dyn SyncTransport>,
        applier: Arc<SyncApplier>,
    ) -> Self {
        Self {
            topology,
            transport,
            applier,
        }
    }

    /// Decides how a payload from `source` reaches `destination`.
    pub fn route(&self, source: &str, destination: &str) -> DeliveryRoute {
        if self.topology.is_embedded(source) && self.topology.is_embedded(destination) {
            DeliveryRoute::Local
        } else if let Some(hub) = self.topology.hub_of(destination) {
            DeliveryRoute::Hub(hub.to_string())
        } else {
            DeliveryRoute::Direct
        }
    }

    /// Must not be called while holding the vote lock of the payload: local deliveries take it.
    pub async fn dispatch(
        &self,
        source: &str,
        destinations: &[ParticipantId],
        payload: &SyncPayload,
    ) -> DispatchReport {
        log::debug!(
            "dispatching {} from {source} to {:?}",
            payload.data_type(),
            destinations
        );

        let attempts = destinations
            .iter()
            .map(|destination| self.deliver(source, destination, payload));
        let deliveries = join_all(attempts).await;

        DispatchReport { deliveries }
    }

    async fn deliver(&self, source: &str, destination: &str, payload: &SyncPayload) -> Delivery {
        let route = self.route(source, destination);

        let result = match &route {
            DeliveryRoute::Local => self.applier.apply(payload.clone()).await,
            DeliveryRoute::Hub(hub) => self.push(hub, payload).await,
            DeliveryRoute::Direct => self.push(destination, payload).await,
        };

        let error = match result {
            Ok(()) => None,
            Err(e) => {
                log::warn!(
                    "cannot deliver {} to {destination} via {:?}: {e}",
                    payload.data_type(),
                    route
                );
                Some(e.to_string())
            }
        };

        Delivery {
            destination: destination.to_string(),
            route,
            error,
        }
    }

    async fn push(&self, target: &str, payload: &SyncPayload) -> anyhow::Result<()> {
        let endpoint = self
            .topology
            .endpoint(target)
            .ok_or_else(|| anyhow!("no endpoint configured for {target}"))?;
        self.transport.push(endpoint, payload).await
    }
}
