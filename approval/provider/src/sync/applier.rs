// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use approval_sdk::{ParticipantId, PartyVoteInfo, SyncPayload, VoteInvite, VoteRequest};

use crate::error::ApprovalError;
use crate::lock::VoteLocks;
use crate::store::VoteStore;

/// Merges incoming sync payloads into the local store. Applying the same payload twice leaves the
/// store as applying it once.
pub struct SyncApplier {
    store: Arc<dyn VoteStore>,
    locks: Arc<VoteLocks>,
}

impl SyncApplier {
    pub fn new(store: Arc<dyn VoteStore>, locks: Arc<VoteLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn apply(&self, payload: SyncPayload) -> Result<()> {
        log::debug!("applying sync payload of type {}", payload.data_type());

        match payload {
            SyncPayload::VoteRequest(request) => {
                let _guard = self.locks.lock(&request.vote_id).await;
                self.apply_request(request)
            }
            SyncPayload::VoteInvite(invite) => {
                let _guard = self.locks.lock(&invite.vote_id).await;
                self.apply_invite(invite)
            }
            SyncPayload::NodeRoute(route) => self.store.upsert_route(route),
            SyncPayload::TeeDatatableManagement(record) => {
                self.store.upsert_tee_datatable_management(record)
            }
        }
    }

    // The status is never copied: every store settles its own copy of the vote. Party entries of
    // participants outside the proposal's voters are dropped.
    fn apply_request(&self, incoming: VoteRequest) -> Result<()> {
        let Some(mut local) = self.store.get_request(&incoming.vote_id)? else {
            let mut request = incoming;
            let voters = voters_of(&request)?;
            request.status = Default::default();
            request
                .party_vote_info
                .retain(|participant, _| voters.contains(participant));
            return self.store.upsert_request(request);
        };

        let voters = voters_of(&local)?;
        let mut entries = incoming.party_vote_info;
        entries.retain(|participant, _| {
            let voter = voters.contains(participant);
            if !voter {
                log::warn!(
                    "dropping party entry of {participant}, not a voter of vote {}",
                    local.vote_id
                );
            }
            voter
        });
        local.merge_party_vote_info(&entries);

        if local.request_payload.initiator_signature().is_none()
            && incoming.request_payload.initiator_signature().is_some()
            && local.request_payload.body == incoming.request_payload.body
        {
            local.request_payload.signature = incoming.request_payload.signature;
        }

        local.modified_at = local.modified_at.max(incoming.modified_at);
        self.store.upsert_request(local)
    }

    // An invite arriving before its request cannot be checked against the voters. It is stored
    // as is and only counted once the request is known.
    fn apply_invite(&self, incoming: VoteInvite) -> Result<()> {
        let request = self.store.get_request(&incoming.vote_id)?;
        if let Some(request) = &request {
            if !voters_of(request)?.contains(&incoming.participant_id) {
                return Err(ApprovalError::UnauthorizedVoter {
                    vote_id: incoming.vote_id,
                    participant: incoming.participant_id,
                }
                .into());
            }
        }

        if let Some(local) = self
            .store
            .get_invite(&incoming.vote_id, &incoming.participant_id)?
        {
            if local.version() > incoming.version() {
                log::debug!(
                    "ignoring stale invite of {} for vote {}",
                    incoming.participant_id,
                    incoming.vote_id
                );
                return Ok(());
            }
        }

        if let Some(mut request) = request {
            if incoming.action.is_some() {
                let entry = BTreeMap::from([(
                    incoming.participant_id.clone(),
                    PartyVoteInfo::from(&incoming),
                )]);
                request.merge_party_vote_info(&entry);
                self.store.upsert_request(request)?;
            }
        }

        self.store.upsert_invite(incoming)
    }
}

fn voters_of(request: &VoteRequest) -> Result<Vec<ParticipantId>> {
    let body = request
        .request_payload
        .decode_body()
        .map_err(ApprovalError::from)?;
    Ok(body.voters)
}
