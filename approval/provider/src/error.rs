// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
use approval_sdk::{CodecError, ParticipantId, VoteId, VoteType};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApprovalError>;

/// The errors surfaced to whoever proposes, replies to or inspects a vote.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("participant {caller} cannot act on behalf of {participant}")]
    IdentityMismatch {
        caller: ParticipantId,
        participant: ParticipantId,
    },
    #[error("vote {0} is still synchronizing: the initiator signature has not arrived yet")]
    NotSynchronized(VoteId),
    #[error("participant {participant} is not a voter of vote {vote_id}")]
    UnauthorizedVoter {
        vote_id: VoteId,
        participant: ParticipantId,
    },
    #[error("vote {0} already exists")]
    AlreadyExists(VoteId),
    #[error("no handler registered for vote type {0}")]
    UnsupportedVoteType(VoteType),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("cannot obtain credentials of {participant}: {reason}")]
    Credentials {
        participant: ParticipantId,
        reason: String,
    },
    #[error("cannot forward reply to hub {hub}: {reason}")]
    HubUnreachable { hub: ParticipantId, reason: String },
    #[error("approved action of vote {vote_id} failed: {reason}")]
    Execution { vote_id: VoteId, reason: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CodecError> for ApprovalError {
    fn from(e: CodecError) -> Self {
        ApprovalError::InvalidPayload(e.to_string())
    }
}

impl From<serde_json::Error> for ApprovalError {
    fn from(e: serde_json::Error) -> Self {
        ApprovalError::InvalidPayload(e.to_string())
    }
}
