// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The ingress of records pushed by other participants.

use std::sync::Arc;

use approval_provider::ApprovalProvider;
use approval_sdk::SyncPayload;
use async_trait::async_trait;

use crate::server::JsonRPCRequestHandler;

/// Merges a pushed record into the local store and settles the vote it belongs to.
pub(crate) struct SyncHandler {
    provider: Arc<ApprovalProvider>,
}

impl SyncHandler {
    pub(crate) fn new(provider: Arc<ApprovalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRPCRequestHandler for SyncHandler {
    type Request = SyncPayload;
    type Response = ();

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response> {
        log::debug!(
            "received {} sync of vote {:?}",
            request.data_type(),
            request.vote_id()
        );

        if let Some(status) = self.provider.reply().accept_sync(request).await? {
            log::debug!("vote status after sync: {status}");
        }
        Ok(())
    }
}
