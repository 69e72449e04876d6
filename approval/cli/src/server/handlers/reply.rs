// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Reply to vote handler and parameters

use std::sync::Arc;

use approval_provider::reply::ReplyOutcome;
use approval_provider::ApprovalProvider;
use approval_sdk::{ParticipantId, VoteAction, VoteId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::server::JsonRPCRequestHandler;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyParams {
    pub participant: ParticipantId,
    pub vote_id: VoteId,
    pub action: VoteAction,
    #[serde(default)]
    pub reason: Option<String>,
}

pub(crate) struct ReplyHandler {
    provider: Arc<ApprovalProvider>,
}

impl ReplyHandler {
    pub(crate) fn new(provider: Arc<ApprovalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRPCRequestHandler for ReplyHandler {
    type Request = ReplyParams;
    type Response = ReplyOutcome;

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response> {
        let outcome = self
            .provider
            .reply()
            .reply(
                request.action,
                request.reason,
                &request.participant,
                &request.vote_id,
            )
            .await?;
        Ok(outcome)
    }
}
