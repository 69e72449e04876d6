// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Casting, settling and inspecting votes.
//!
//! A reply is signed by the voter over its reply body and the initiator's signature, then
//! committed according to the local topology:
//!
//! * hub: the invite is written to the local store and the quorum is evaluated right away;
//! * participant: the signed invite is forwarded to the hub, which settles it on ingress;
//! * autonomy: the invite and the party projection are written locally, the quorum is evaluated,
//!   and both records are fanned out to the other participants of the vote.
//!
//! A vote is approved once every voter approved. A rejection never ends a vote by itself.

use std::sync::Arc;

use approval_identity::{sign, verify, CredentialProvider, RsaPublicKey};
use approval_sdk::{
    ParticipantId, ReplyBody, SignedReply, SyncPayload, VoteAction, VoteInvite, VoteRequest,
    VoteStatus, VoteType,
};
use chrono::Utc;
use serde::Serialize;
use serde_bytes::ByteBuf;

use crate::error::{ApprovalError, Result};
use crate::lock::VoteLocks;
use crate::registry::{VoteDetail, VoteMessage, VoteTypeRegistry};
use crate::store::VoteStore;
use crate::sync::{DispatchReport, SyncApplier, SyncDispatcher};
use crate::topology::{Topology, TopologyOracle};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOutcome {
    /// The status of the vote as known locally after the reply.
    pub status: VoteStatus,
    pub dispatch: DispatchReport,
}

pub struct ReplyService {
    store: Arc<dyn VoteStore>,
    registry: Arc<VoteTypeRegistry>,
    credentials: Arc<dyn CredentialProvider>,
    topology: Arc<dyn TopologyOracle>,
    dispatcher: Arc<SyncDispatcher>,
    applier: Arc<SyncApplier>,
    locks: Arc<VoteLocks>,
}

impl ReplyService {
    pub fn new(
        store: Arc<dyn VoteStore>,
        registry: Arc<VoteTypeRegistry>,
        credentials: Arc<dyn CredentialProvider>,
        topology: Arc<dyn TopologyOracle>,
        dispatcher: Arc<SyncDispatcher>,
        applier: Arc<SyncApplier>,
        locks: Arc<VoteLocks>,
    ) -> Self {
        Self {
            store,
            registry,
            credentials,
            topology,
            dispatcher,
            applier,
            locks,
        }
    }

    /// Casts the vote of `participant` on `vote_id`. Replying again overwrites the previous reply.
    /// Once the vote is settled, replies leave it untouched and only report its status.
    pub async fn reply(
        &self,
        action: VoteAction,
        reason: Option<String>,
        participant: &str,
        vote_id: &str,
    ) -> Result<ReplyOutcome> {
        self.check_identity(participant)?;

        let guard = self.locks.lock(vote_id).await;

        let mut request = self.load_request(vote_id)?;
        let voters = request.request_payload.decode_body()?.voters;
        if !voters.iter().any(|v| v == participant) {
            return Err(ApprovalError::UnauthorizedVoter {
                vote_id: vote_id.to_string(),
                participant: participant.to_string(),
            });
        }
        if request.status.is_terminal() {
            log::info!(
                "ignoring {action} of {participant}: vote {vote_id} is already {}",
                request.status
            );
            return Ok(ReplyOutcome {
                status: request.status,
                dispatch: DispatchReport::default(),
            });
        }
        let mut invite = self.store.get_invite(vote_id, participant)?.ok_or_else(|| {
            ApprovalError::NotFound(format!("invite of {participant} for vote {vote_id}"))
        })?;

        let exempt = request.vote_type == VoteType::NodeRoute && request.is_executor(participant);
        let reply_payload = if exempt {
            log::debug!("{participant} replies to route vote {vote_id} as unsigned executor");
            None
        } else {
            let initiator_signature = request
                .request_payload
                .initiator_signature()
                .ok_or_else(|| ApprovalError::NotSynchronized(vote_id.to_string()))?;
            Some(self.sign_reply(participant, vote_id, action, initiator_signature)?)
        };

        let cached_revision = request
            .party_vote_info
            .get(participant)
            .map_or(0, |info| info.revision);
        invite.action = Some(action);
        invite.reason = reason;
        invite.reply_payload = reply_payload;
        invite.revision = invite.revision.max(cached_revision) + 1;
        invite.modified_at = Utc::now();

        log::info!("{participant} replied {action} to vote {vote_id}");

        match self.topology.mode() {
            Topology::Hub => {
                request.record_reply(&invite);
                self.store.upsert_invite(invite)?;
                self.store.upsert_request(request)?;

                let (status, records) = self.settle_locked(vote_id).await?;
                drop(guard);

                let dispatch = self.replicate(vote_id, records).await?;
                Ok(ReplyOutcome { status, dispatch })
            }
            Topology::Participant => {
                drop(guard);
                let hub = self
                    .topology
                    .hub()
                    .ok_or_else(|| anyhow::anyhow!("participant mode without a hub"))?
                    .to_string();

                let dispatch = self
                    .dispatcher
                    .dispatch(participant, &[hub.clone()], &SyncPayload::VoteInvite(invite))
                    .await;
                if let Some(failed) = dispatch.failures().next() {
                    return Err(ApprovalError::HubUnreachable {
                        hub,
                        reason: failed.error.clone().unwrap_or_default(),
                    });
                }

                Ok(ReplyOutcome {
                    status: request.status,
                    dispatch,
                })
            }
            Topology::Autonomy => {
                self.store.upsert_invite(invite.clone())?;
                request.record_reply(&invite);
                self.store.upsert_request(request)?;

                // the reply is fanned out even when the approved action failed
                let settled = self.settle_locked(vote_id).await;
                let request = self.load_request(vote_id)?;
                drop(guard);

                let destinations = participants_of(&request, &voters, participant);
                let mut dispatch = self
                    .dispatcher
                    .dispatch(participant, &destinations, &SyncPayload::VoteRequest(request))
                    .await;
                dispatch.merge(
                    self.dispatcher
                        .dispatch(participant, &destinations, &SyncPayload::VoteInvite(invite))
                        .await,
                );

                // peers create the records of an approved action when they settle themselves
                let (status, _) = settled?;
                Ok(ReplyOutcome { status, dispatch })
            }
        }
    }

    /// Evaluates the quorum of `vote_id` and executes the approved action the first time it is
    /// reached.
    pub async fn settle(&self, vote_id: &str) -> Result<VoteStatus> {
        let (status, records) = {
            let _guard = self.locks.lock(vote_id).await;
            self.settle_locked(vote_id).await?
        };
        self.replicate(vote_id, records).await?;
        Ok(status)
    }

    /// Applies a payload received from another participant, then settles the vote it belongs to.
    pub async fn accept_sync(&self, payload: SyncPayload) -> Result<Option<VoteStatus>> {
        let vote_id = payload.vote_id().map(str::to_string);
        self.applier
            .apply(payload)
            .await
            .map_err(|e| match e.downcast::<ApprovalError>() {
                Ok(e) => e,
                Err(e) => ApprovalError::Internal(e),
            })?;

        match vote_id {
            Some(vote_id) if self.store.get_request(&vote_id)?.is_some() => {
                Ok(Some(self.settle(&vote_id).await?))
            }
            _ => Ok(None),
        }
    }

    /// Every vote `participant` initiated or is invited to, newest first.
    pub fn list_votes(&self, participant: &str) -> Result<Vec<VoteMessage>> {
        let mut requests = Vec::new();
        for request in self.store.list_requests()? {
            if self.is_party(&request, participant)? {
                requests.push(request);
            }
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        requests
            .iter()
            .map(|r| {
                self.registry
                    .get(r.vote_type)?
                    .describe_for_listing(&r.vote_id)
            })
            .collect()
    }

    pub fn vote_detail(&self, participant: &str, vote_id: &str) -> Result<VoteDetail> {
        let request = self.load_request(vote_id)?;
        if !self.is_party(&request, participant)? {
            return Err(ApprovalError::UnauthorizedVoter {
                vote_id: vote_id.to_string(),
                participant: participant.to_string(),
            });
        }

        let is_initiator = request.initiator == participant;
        self.registry
            .get(request.vote_type)?
            .detail(is_initiator, participant, vote_id)
    }

    fn check_identity(&self, participant: &str) -> Result<()> {
        let local = self.topology.local_participant();
        if self.topology.mode() == Topology::Autonomy && participant != local {
            return Err(ApprovalError::IdentityMismatch {
                caller: local.to_string(),
                participant: participant.to_string(),
            });
        }
        Ok(())
    }

    fn load_request(&self, vote_id: &str) -> Result<VoteRequest> {
        self.store
            .get_request(vote_id)?
            .ok_or_else(|| ApprovalError::NotFound(format!("vote {vote_id}")))
    }

    fn is_party(&self, request: &VoteRequest, participant: &str) -> Result<bool> {
        Ok(request.initiator == participant
            || request.party_vote_info.contains_key(participant)
            || self
                .store
                .get_invite(&request.vote_id, participant)?
                .is_some())
    }

    fn sign_reply(
        &self,
        participant: &str,
        vote_id: &str,
        action: VoteAction,
        initiator_signature: &str,
    ) -> Result<SignedReply> {
        let credentials_error = |reason: String| ApprovalError::Credentials {
            participant: participant.to_string(),
            reason,
        };

        let credentials = self
            .credentials
            .credentials(participant)
            .map_err(|e| credentials_error(e.to_string()))?;
        let cert_chain = credentials
            .decoded_cert_chain()
            .map_err(|e| credentials_error(e.to_string()))?;

        let body = ReplyBody {
            vote_request_id: vote_id.to_string(),
            voter: participant.to_string(),
            action,
        }
        .encode()?;
        let signature = sign(
            &credentials.private_key,
            &ReplyBody::signing_input(&body, initiator_signature),
        )?;

        Ok(SignedReply {
            body,
            signature,
            cert_chain: cert_chain.into_iter().map(ByteBuf::from).collect(),
        })
    }

    // Must be called with the vote lock held. The approved status is persisted before the
    // handler runs, so the handler runs at most once per vote and store.
    async fn settle_locked(&self, vote_id: &str) -> Result<(VoteStatus, Vec<SyncPayload>)> {
        let mut request = self.load_request(vote_id)?;
        if request.status.is_terminal() {
            return Ok((request.status, vec![]));
        }

        let approved = match self.topology.mode() {
            Topology::Autonomy => request.all_parties_approved(),
            Topology::Hub => {
                let voters = request.request_payload.decode_body()?.voters;
                let invites = self.store.invites_of(vote_id)?;
                !voters.is_empty()
                    && voters.iter().all(|v| {
                        invites
                            .iter()
                            .any(|i| &i.participant_id == v && i.is_approved())
                    })
            }
            Topology::Participant => false,
        };
        if !approved {
            return Ok((request.status, vec![]));
        }

        request.status = VoteStatus::Approved;
        request.modified_at = Utc::now();
        let vote_type = request.vote_type;
        self.store.upsert_request(request)?;
        log::info!("{vote_type} vote {vote_id} approved");

        let records = self
            .registry
            .get(vote_type)?
            .on_quorum_approved(vote_id)
            .await
            .map_err(|e| {
                log::error!("approved action of vote {vote_id} failed: {e}");
                e
            })?;

        Ok((VoteStatus::Approved, records))
    }

    // A hub replicates the records created by an approved action to the remote participants of
    // the vote. Peers create their own records when they settle.
    async fn replicate(&self, vote_id: &str, records: Vec<SyncPayload>) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        if records.is_empty() || self.topology.mode() != Topology::Hub {
            return Ok(report);
        }

        let request = self.load_request(vote_id)?;
        let voters = request.request_payload.decode_body()?.voters;
        let local = self.topology.local_participant();
        let destinations = participants_of(&request, &voters, local)
            .into_iter()
            .filter(|p| !self.topology.is_embedded(p))
            .collect::<Vec<_>>();

        for record in records {
            report.merge(self.dispatcher.dispatch(local, &destinations, &record).await);
        }
        Ok(report)
    }
}

/// The voters and the initiator of `request`, without `except`.
fn participants_of(
    request: &VoteRequest,
    voters: &[ParticipantId],
    except: &str,
) -> Vec<ParticipantId> {
    let mut participants = voters.to_vec();
    if !participants.contains(&request.initiator) {
        participants.push(request.initiator.clone());
    }
    participants.retain(|p| p != except);
    participants
}

/// Checks the countersignature stored on `invite` against the voter's public key.
pub fn verify_reply(
    invite: &VoteInvite,
    initiator_signature: &str,
    public_key: &RsaPublicKey,
) -> Result<()> {
    let payload = invite.reply_payload.as_ref().ok_or_else(|| {
        ApprovalError::InvalidPayload(format!(
            "reply of {} to vote {} is not signed",
            invite.participant_id, invite.vote_id
        ))
    })?;

    let body = payload.decode_body()?;
    if body.vote_request_id != invite.vote_id
        || body.voter != invite.participant_id
        || Some(body.action) != invite.action
    {
        return Err(ApprovalError::InvalidPayload(format!(
            "signed reply does not match the invite of {} to vote {}",
            invite.participant_id, invite.vote_id
        )));
    }

    verify(
        public_key,
        &ReplyBody::signing_input(&payload.body, initiator_signature),
        &payload.signature,
    )
    .map_err(|e| ApprovalError::InvalidPayload(format!("invalid reply signature: {e}")))
}

#[cfg(test)]
mod tests;
