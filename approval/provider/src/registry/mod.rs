// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The vote categories and the handlers implementing them.
//!
//! A [`VoteTypeHandler`] decides who votes on a proposal of its category and what happens once
//! everybody approved. Handlers are registered once at startup in a [`VoteTypeRegistry`].

mod node_route;
mod project_create;
mod tee_download;

pub use node_route::{NodeRouteConfig, NodeRouteHandler};
pub use project_create::{ProjectCreateConfig, ProjectCreateHandler};
pub use tee_download::{TeeDownloadConfig, TeeDownloadHandler};

use std::collections::HashMap;
use std::sync::Arc;

use approval_sdk::{
    ParticipantId, PartyVoteInfo, ProposalBody, ProposalPayload, SyncPayload, VoteAction, VoteId,
    VoteRequest, VoteStatus, VoteType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApprovalError, Result};
use crate::store::VoteStore;
use crate::topology::TopologyOracle;

/// Carries out an approved action, e.g. actually opening the route.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &VoteRequest) -> anyhow::Result<()>;
}

/// An [`ActionExecutor`] that only logs what would be executed.
pub struct LoggingExecutor;

#[async_trait]
impl ActionExecutor for LoggingExecutor {
    async fn execute(&self, request: &VoteRequest) -> anyhow::Result<()> {
        log::info!(
            "executing approved {} vote {} on behalf of {:?}",
            request.vote_type,
            request.vote_id,
            request.executors
        );
        Ok(())
    }
}

/// What every handler needs from its surroundings.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn VoteStore>,
    pub topology: Arc<dyn TopologyOracle>,
    pub executor: Arc<dyn ActionExecutor>,
}

/// A vote as shown in a participant's message list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteMessage {
    pub vote_id: VoteId,
    #[serde(rename = "type")]
    pub vote_type: VoteType,
    pub title: String,
    pub initiator: ParticipantId,
    pub status: VoteStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// The last known reply of one voter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStatus {
    pub participant_id: ParticipantId,
    pub action: Option<VoteAction>,
    pub reason: Option<String>,
    /// Whether a countersigned reply is stored locally.
    pub signed: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetail {
    #[serde(flatten)]
    pub message: VoteMessage,
    pub is_initiator: bool,
    pub participant_id: ParticipantId,
    pub executors: Vec<ParticipantId>,
    pub proposal: ProposalBody,
    /// The reply of `participant_id`, if any.
    pub own_action: Option<VoteAction>,
    pub parties: Vec<PartyStatus>,
}

#[async_trait]
pub trait VoteTypeHandler: Send + Sync {
    fn vote_type(&self) -> VoteType;

    fn context(&self) -> &HandlerContext;

    /// Builds the unsigned vote request proposed by `participant`.
    fn propose(&self, participant: &str, config: Value) -> Result<VoteRequest>;

    /// Executes the approved action of `vote_id`. Called once the vote is persisted as approved,
    /// so it must tolerate being called again for the same vote. Returns the records the action
    /// created, for replication to the other participants.
    async fn on_quorum_approved(&self, vote_id: &str) -> Result<Vec<SyncPayload>>;

    /// A one-line summary of the proposal.
    fn title(&self, body: &ProposalBody) -> String;

    fn describe_for_listing(&self, vote_id: &str) -> Result<VoteMessage> {
        let request = load_request(self.context(), vote_id)?;
        let body = request.request_payload.decode_body()?;
        Ok(VoteMessage {
            vote_id: request.vote_id.clone(),
            vote_type: request.vote_type,
            title: self.title(&body),
            initiator: request.initiator.clone(),
            status: request.status,
            created_at: request.created_at,
            modified_at: request.modified_at,
        })
    }

    /// One entry per voter, from the local invites where present and from the cached party
    /// projection otherwise.
    fn party_statuses(&self, vote_id: &str) -> Result<Vec<PartyStatus>> {
        let ctx = self.context();
        let request = load_request(ctx, vote_id)?;

        let mut statuses = Vec::with_capacity(request.party_vote_info.len());
        for (participant, info) in request.party_vote_info.iter() {
            let status = match ctx.store.get_invite(vote_id, participant)? {
                Some(invite) if invite.version() >= info.version() => PartyStatus {
                    participant_id: participant.clone(),
                    action: invite.action,
                    reason: invite.reason.clone(),
                    signed: invite.reply_payload.is_some(),
                    updated_at: invite.modified_at,
                },
                invite => PartyStatus {
                    participant_id: participant.clone(),
                    action: info.action,
                    reason: info.reason.clone(),
                    signed: invite.map_or(false, |i| i.reply_payload.is_some()),
                    updated_at: info.updated_at,
                },
            };
            statuses.push(status);
        }
        Ok(statuses)
    }

    fn detail(&self, is_initiator: bool, participant: &str, vote_id: &str) -> Result<VoteDetail> {
        let request = load_request(self.context(), vote_id)?;
        let parties = self.party_statuses(vote_id)?;
        let own_action = parties
            .iter()
            .find(|p| p.participant_id == participant)
            .and_then(|p| p.action);

        Ok(VoteDetail {
            message: self.describe_for_listing(vote_id)?,
            is_initiator,
            participant_id: participant.to_string(),
            executors: request.executors.clone(),
            proposal: request.request_payload.decode_body()?,
            own_action,
            parties,
        })
    }
}

/// Maps every vote category to its handler.
#[derive(Default)]
pub struct VoteTypeRegistry {
    handlers: HashMap<VoteType, Arc<dyn VoteTypeHandler>>,
}

impl VoteTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with the handlers of all known categories.
    pub fn with_default_handlers(ctx: HandlerContext) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NodeRouteHandler::new(ctx.clone())));
        registry.register(Arc::new(TeeDownloadHandler::new(ctx.clone())));
        registry.register(Arc::new(ProjectCreateHandler::new(ctx)));
        registry
    }

    /// Registers `handler` for its category, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn VoteTypeHandler>) {
        self.handlers.insert(handler.vote_type(), handler);
    }

    pub fn get(&self, vote_type: VoteType) -> Result<Arc<dyn VoteTypeHandler>> {
        self.handlers
            .get(&vote_type)
            .cloned()
            .ok_or(ApprovalError::UnsupportedVoteType(vote_type))
    }
}

pub(crate) fn load_request(ctx: &HandlerContext, vote_id: &str) -> Result<VoteRequest> {
    ctx.store
        .get_request(vote_id)?
        .ok_or_else(|| ApprovalError::NotFound(format!("vote {vote_id}")))
}

/// Builds a pending, unsigned vote request with a fresh id and an unanswered party entry per
/// voter. Duplicate voters are dropped, keeping the first occurrence.
pub(crate) fn new_vote_request(
    vote_type: VoteType,
    initiator: &str,
    voters: Vec<ParticipantId>,
    executors: Vec<ParticipantId>,
    fields: Map<String, Value>,
) -> Result<VoteRequest> {
    let mut unique = Vec::with_capacity(voters.len());
    for v in voters {
        if v.is_empty() {
            return Err(ApprovalError::InvalidPayload(
                "voter id must not be empty".to_string(),
            ));
        }
        if !unique.contains(&v) {
            unique.push(v);
        }
    }

    let now = Utc::now();
    let party_vote_info = unique
        .iter()
        .map(|v| (v.clone(), PartyVoteInfo::unanswered(now)))
        .collect();
    let body = ProposalBody::new(unique, fields);

    Ok(VoteRequest {
        vote_id: uuid::Uuid::new_v4().to_string(),
        vote_type,
        initiator: initiator.to_string(),
        executors,
        request_payload: ProposalPayload::unsigned(&body)?,
        status: VoteStatus::Pending,
        party_vote_info,
        created_at: now,
        modified_at: now,
    })
}

/// Runs the executor, mapping its failure to [`ApprovalError::Execution`].
pub(crate) async fn execute(ctx: &HandlerContext, request: &VoteRequest) -> Result<()> {
    ctx.executor
        .execute(request)
        .await
        .map_err(|e| ApprovalError::Execution {
            vote_id: request.vote_id.clone(),
            reason: e.to_string(),
        })
}
