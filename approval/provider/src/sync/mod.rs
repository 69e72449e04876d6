// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Propagation of vote records between participants that do not share a store.
//!
//! The [`SyncDispatcher`] fans a [`SyncPayload`] out to a set of participants, choosing per
//! destination between the local store, the hub hosting the destination, or the destination
//! itself. The [`SyncApplier`] is the receiving end: it merges incoming records into the local
//! store.

mod applier;
mod dispatcher;

pub use applier::SyncApplier;
pub use dispatcher::SyncDispatcher;

use std::time::Duration;

use anyhow::Result;
use approval_sdk::{ParticipantId, SyncPayload};
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::json_rpc_methods;
use crate::jsonrpc::{JsonRpcClient, JsonRpcClientImpl};

/// How a payload reached, or failed to reach, a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "hub")]
pub enum DeliveryRoute {
    /// Source and destination share the local store.
    Local,
    /// Pushed to the hub embedding the destination.
    Hub(ParticipantId),
    /// Pushed to the destination itself.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub destination: ParticipantId,
    pub route: DeliveryRoute,
    /// Set when the delivery failed.
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One entry per attempted delivery, in destination order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| !d.is_success())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn merge(&mut self, other: DispatchReport) {
        self.deliveries.extend(other.deliveries);
    }
}

/// Pushes a payload to the ingress of a remote participant or hub.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push(&self, endpoint: &Url, payload: &SyncPayload) -> Result<()>;
}

/// Delivers payloads as a JSON-RPC `sync` request.
pub struct JsonRpcSyncTransport {
    timeout: Duration,
}

impl JsonRpcSyncTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SyncTransport for JsonRpcSyncTransport {
    async fn push(&self, endpoint: &Url, payload: &SyncPayload) -> Result<()> {
        let client = JsonRpcClientImpl::new(endpoint.clone(), Some(self.timeout));
        client
            .request::<()>(json_rpc_methods::SYNC, serde_json::to_value(payload)?)
            .await
    }
}
