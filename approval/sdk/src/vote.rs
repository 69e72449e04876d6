// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Vote request and vote invite records.

use crate::payload::{ProposalPayload, SignedReply};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumString};

pub type ParticipantId = String;
pub type VoteId = String;

/// The action category a vote is about. Each category has its own handler deciding who votes
/// and what happens once everybody approved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    /// Create a network route between two participants.
    NodeRoute,
    /// Let a TEE participant pull a datatable on behalf of its owner.
    TeeDownload,
    /// Create a project shared by several participants.
    ProjectCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VoteStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VoteStatus::Pending)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteAction {
    Approved,
    Rejected,
}

/// Orders the copies of one participant's reply. Copies are stamped by different machines, so
/// wall clock time only breaks ties: an answer beats no answer, then the higher revision wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyVersion {
    answered: bool,
    revision: u64,
    at: DateTime<Utc>,
}

/// The last known reply of one participant, cached on the vote request. Only peers running
/// without a hub rely on it, since they cannot read the other participants' invites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyVoteInfo {
    pub action: Option<VoteAction>,
    pub reason: Option<String>,
    /// Mirrors [`VoteInvite::revision`].
    #[serde(default)]
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl PartyVoteInfo {
    pub fn unanswered(at: DateTime<Utc>) -> Self {
        Self {
            action: None,
            reason: None,
            revision: 0,
            updated_at: at,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.action == Some(VoteAction::Approved)
    }

    pub fn version(&self) -> ReplyVersion {
        ReplyVersion {
            answered: self.action.is_some(),
            revision: self.revision,
            at: self.updated_at,
        }
    }
}

impl From<&VoteInvite> for PartyVoteInfo {
    fn from(invite: &VoteInvite) -> Self {
        Self {
            action: invite.action,
            reason: invite.reason.clone(),
            revision: invite.revision,
            updated_at: invite.modified_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_id: VoteId,
    #[serde(rename = "type")]
    pub vote_type: VoteType,
    pub initiator: ParticipantId,
    /// Participants executing the action once approved, in order.
    pub executors: Vec<ParticipantId>,
    pub request_payload: ProposalPayload,
    pub status: VoteStatus,
    #[serde(default)]
    pub party_vote_info: BTreeMap<ParticipantId, PartyVoteInfo>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl VoteRequest {
    /// Records the reply of `participant`, replacing whatever was cached for it.
    pub fn record_party_vote(
        &mut self,
        participant: &str,
        action: VoteAction,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) {
        let revision = self
            .party_vote_info
            .get(participant)
            .map_or(0, |info| info.revision)
            + 1;
        self.party_vote_info.insert(
            participant.to_string(),
            PartyVoteInfo {
                action: Some(action),
                reason,
                revision,
                updated_at: at,
            },
        );
        self.modified_at = at;
    }

    /// Caches the reply held by `invite`, replacing whatever was cached for its participant.
    pub fn record_reply(&mut self, invite: &VoteInvite) {
        self.party_vote_info
            .insert(invite.participant_id.clone(), PartyVoteInfo::from(invite));
        self.modified_at = self.modified_at.max(invite.modified_at);
    }

    /// Merges the cached replies of another copy of this request. Per participant, the entry with
    /// the greater [`ReplyVersion`] wins; ties keep the local entry.
    pub fn merge_party_vote_info(&mut self, incoming: &BTreeMap<ParticipantId, PartyVoteInfo>) {
        for (participant, info) in incoming {
            match self.party_vote_info.get(participant) {
                Some(local) if local.version() >= info.version() => {}
                _ => {
                    self.party_vote_info
                        .insert(participant.clone(), info.clone());
                }
            }
        }
    }

    /// True when every cached party entry is approved. An empty projection is never approved.
    pub fn all_parties_approved(&self) -> bool {
        !self.party_vote_info.is_empty()
            && self.party_vote_info.values().all(PartyVoteInfo::is_approved)
    }

    pub fn is_executor(&self, participant: &str) -> bool {
        self.executors.iter().any(|e| e == participant)
    }
}

/// The durable record of a single participant's reply, keyed by `(vote_id, participant_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInvite {
    pub vote_id: VoteId,
    pub participant_id: ParticipantId,
    pub action: Option<VoteAction>,
    pub reason: Option<String>,
    /// Absent for participants that cannot sign.
    pub reply_payload: Option<SignedReply>,
    /// Bumped by the participant on every reply.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl VoteInvite {
    pub fn new(vote_id: &str, participant_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            vote_id: vote_id.to_string(),
            participant_id: participant_id.to_string(),
            action: None,
            reason: None,
            reply_payload: None,
            revision: 0,
            created_at: at,
            modified_at: at,
        }
    }

    pub fn key(&self) -> (VoteId, ParticipantId) {
        (self.vote_id.clone(), self.participant_id.clone())
    }

    pub fn is_approved(&self) -> bool {
        self.action == Some(VoteAction::Approved)
    }

    pub fn version(&self) -> ReplyVersion {
        ReplyVersion {
            answered: self.action.is_some(),
            revision: self.revision,
            at: self.modified_at,
        }
    }
}
