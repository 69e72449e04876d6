// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Proposing new votes.

use std::sync::Arc;

use approval_identity::{sign, CredentialProvider};
use approval_sdk::{SyncPayload, VoteId, VoteInvite, VoteType};
use serde_json::Value;

use crate::error::{ApprovalError, Result};
use crate::lock::VoteLocks;
use crate::registry::VoteTypeRegistry;
use crate::store::VoteStore;
use crate::sync::{DispatchReport, SyncDispatcher};
use crate::topology::{Topology, TopologyOracle};

pub struct ApprovalService {
    store: Arc<dyn VoteStore>,
    registry: Arc<VoteTypeRegistry>,
    credentials: Arc<dyn CredentialProvider>,
    topology: Arc<dyn TopologyOracle>,
    dispatcher: Arc<SyncDispatcher>,
    locks: Arc<VoteLocks>,
}

impl ApprovalService {
    pub fn new(
        store: Arc<dyn VoteStore>,
        registry: Arc<VoteTypeRegistry>,
        credentials: Arc<dyn CredentialProvider>,
        topology: Arc<dyn TopologyOracle>,
        dispatcher: Arc<SyncDispatcher>,
        locks: Arc<VoteLocks>,
    ) -> Self {
        Self {
            store,
            registry,
            credentials,
            topology,
            dispatcher,
            locks,
        }
    }

    /// Creates a vote of `vote_type` proposed by `proposer`, together with one invite per voter.
    /// Nothing is executed or sent: see [`ApprovalService::announce`].
    pub async fn propose(
        &self,
        vote_type: VoteType,
        proposer: &str,
        config: Value,
    ) -> Result<VoteId> {
        if self.topology.mode() == Topology::Autonomy
            && proposer != self.topology.local_participant()
        {
            return Err(ApprovalError::IdentityMismatch {
                caller: self.topology.local_participant().to_string(),
                participant: proposer.to_string(),
            });
        }

        let handler = self.registry.get(vote_type)?;
        let mut request = handler.propose(proposer, config)?;

        let voters = request.request_payload.decode_body()?.voters;
        if voters.is_empty() {
            return Err(ApprovalError::InvalidPayload(
                "a vote needs at least one voter".to_string(),
            ));
        }

        if self.topology.can_sign(proposer) {
            let credentials = self.credentials.credentials(proposer).map_err(|e| {
                ApprovalError::Credentials {
                    participant: proposer.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let signature = sign(&credentials.private_key, &request.request_payload.body)?;
            request.request_payload.signature = Some(signature);
        }

        let vote_id = request.vote_id.clone();
        let invites = voters
            .iter()
            .map(|v| VoteInvite::new(&vote_id, v, request.created_at))
            .collect();

        let _guard = self.locks.lock(&vote_id).await;
        if !self.store.create_vote(request, invites)? {
            return Err(ApprovalError::AlreadyExists(vote_id));
        }

        log::info!("{vote_type} vote {vote_id} proposed by {proposer} to {voters:?}");

        Ok(vote_id)
    }

    /// Sends the vote request and every invite of `vote_id` to all participants of the vote but
    /// the local one.
    pub async fn announce(&self, vote_id: &str) -> Result<DispatchReport> {
        let (request, invites) = {
            let _guard = self.locks.lock(vote_id).await;
            let request = self
                .store
                .get_request(vote_id)?
                .ok_or_else(|| ApprovalError::NotFound(format!("vote {vote_id}")))?;
            (request, self.store.invites_of(vote_id)?)
        };

        let local = self.topology.local_participant().to_string();
        let mut destinations = request.request_payload.decode_body()?.voters;
        if !destinations.contains(&request.initiator) {
            destinations.push(request.initiator.clone());
        }
        destinations.retain(|d| d != &local);

        let mut report = self
            .dispatcher
            .dispatch(&local, &destinations, &SyncPayload::VoteRequest(request))
            .await;
        for invite in invites {
            report.merge(
                self.dispatcher
                    .dispatch(&local, &destinations, &SyncPayload::VoteInvite(invite))
                    .await,
            );
        }

        log::debug!(
            "vote {vote_id} announced with {} failed deliveries",
            report.failures().count()
        );
        Ok(report)
    }
}
