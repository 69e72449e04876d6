// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Propose vote handler and parameters

use std::sync::Arc;

use approval_provider::sync::DispatchReport;
use approval_provider::ApprovalProvider;
use approval_sdk::{ParticipantId, VoteId, VoteType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::server::JsonRPCRequestHandler;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeParams {
    pub participant: ParticipantId,
    pub vote_type: VoteType,
    /// The category specific configuration of the action.
    pub config: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeResponse {
    pub vote_id: VoteId,
    /// The deliveries of the announcement to the other participants.
    pub dispatch: DispatchReport,
}

/// Creates the vote, then announces it to every other participant.
pub(crate) struct ProposeHandler {
    provider: Arc<ApprovalProvider>,
}

impl ProposeHandler {
    pub(crate) fn new(provider: Arc<ApprovalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRPCRequestHandler for ProposeHandler {
    type Request = ProposeParams;
    type Response = ProposeResponse;

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response> {
        let approval = self.provider.approval();
        let vote_id = approval
            .propose(request.vote_type, &request.participant, request.config)
            .await?;
        let dispatch = approval.announce(&vote_id).await?;

        Ok(ProposeResponse { vote_id, dispatch })
    }
}
