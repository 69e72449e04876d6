// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Persistence of vote requests, vote invites and the records approved votes produce.

mod memory;
mod persistent;

pub use memory::MemoryVoteStore;
pub use persistent::PersistentVoteStore;

use anyhow::Result;
use approval_sdk::{NodeRoute, TeeDatatableManagement, VoteInvite, VoteRequest};

/// The local store of one participant (or of a hub and everybody it embeds).
///
/// Every write is an upsert keyed by the record's identity: `vote_id` for requests,
/// `(vote_id, participant_id)` for invites.
pub trait VoteStore: Send + Sync {
    /// Inserts a new vote and its invites in one step. Returns `Ok(false)` and writes nothing
    /// when `request.vote_id` already exists.
    fn create_vote(&self, request: VoteRequest, invites: Vec<VoteInvite>) -> Result<bool>;

    fn get_request(&self, vote_id: &str) -> Result<Option<VoteRequest>>;
    fn upsert_request(&self, request: VoteRequest) -> Result<()>;
    fn list_requests(&self) -> Result<Vec<VoteRequest>>;

    fn get_invite(&self, vote_id: &str, participant: &str) -> Result<Option<VoteInvite>>;
    fn upsert_invite(&self, invite: VoteInvite) -> Result<()>;
    /// All invites of a vote, ordered by participant.
    fn invites_of(&self, vote_id: &str) -> Result<Vec<VoteInvite>>;

    fn get_route(&self, route_id: &str) -> Result<Option<NodeRoute>>;
    fn upsert_route(&self, route: NodeRoute) -> Result<()>;

    fn get_tee_datatable_management(
        &self,
        management_id: &str,
    ) -> Result<Option<TeeDatatableManagement>>;
    fn upsert_tee_datatable_management(&self, record: TeeDatatableManagement) -> Result<()>;
}
