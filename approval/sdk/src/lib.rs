// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Types shared by every participant of the approval protocol: vote records, the signed proposal
//! and reply payloads, and the envelope used to replicate records between participants.

pub mod payload;
pub mod record;
pub mod sync;
pub mod vote;

pub use payload::{
    decode_json_base64, encode_json_base64, CodecError, ProposalBody, ProposalPayload, ReplyBody,
    SignedReply,
};
pub use record::{NodeRoute, RouteStatus, TeeDatatableManagement, TeeJobKind, TeeJobStatus};
pub use sync::{SyncDataType, SyncPayload};
pub use vote::{
    ParticipantId, PartyVoteInfo, ReplyVersion, VoteAction, VoteId, VoteInvite, VoteRequest,
    VoteStatus, VoteType,
};
