// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The read side: the votes of a participant and the detail of one vote.

use std::sync::Arc;

use approval_provider::registry::{VoteDetail, VoteMessage};
use approval_provider::ApprovalProvider;
use approval_sdk::{ParticipantId, VoteId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::server::JsonRPCRequestHandler;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVotesParams {
    pub participant: ParticipantId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetailParams {
    pub participant: ParticipantId,
    pub vote_id: VoteId,
}

/// Lists the votes a participant initiated or votes on, newest first.
pub(crate) struct ListVotesHandler {
    provider: Arc<ApprovalProvider>,
}

impl ListVotesHandler {
    pub(crate) fn new(provider: Arc<ApprovalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRPCRequestHandler for ListVotesHandler {
    type Request = ListVotesParams;
    type Response = Vec<VoteMessage>;

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response> {
        Ok(self.provider.reply().list_votes(&request.participant)?)
    }
}

pub(crate) struct VoteDetailHandler {
    provider: Arc<ApprovalProvider>,
}

impl VoteDetailHandler {
    pub(crate) fn new(provider: Arc<ApprovalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JsonRPCRequestHandler for VoteDetailHandler {
    type Request = VoteDetailParams;
    type Response = VoteDetail;

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response> {
        Ok(self
            .provider
            .reply()
            .vote_detail(&request.participant, &request.vote_id)?)
    }
}
