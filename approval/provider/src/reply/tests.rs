// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
use std::collections::HashMap;

use approval_sdk::{RouteStatus, SyncPayload, VoteAction, VoteInvite, VoteStatus, VoteType};
use chrono::{Duration, Utc};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use serde_json::{json, Value};

use crate::error::ApprovalError;
use crate::reply::verify_reply;
use crate::store::VoteStore;
use crate::testing::{harness, harness_with, url, Harness, RecordingTransport, KEY};
use crate::topology::{StaticTopology, Topology};

const APPROVED: VoteAction = VoteAction::Approved;
const REJECTED: VoteAction = VoteAction::Rejected;

fn hub(embedded: &[&str]) -> StaticTopology {
    embedded
        .iter()
        .fold(StaticTopology::new(Topology::Hub, "center"), |t, p| {
            t.with_embedded(p)
        })
}

fn project(members: &[&str]) -> Value {
    json!({"projectId": "p-1", "name": "churn", "members": members})
}

async fn propose_project(h: &Harness, initiator: &str, members: &[&str]) -> String {
    h.provider
        .approval()
        .propose(VoteType::ProjectCreate, initiator, project(members))
        .await
        .unwrap()
}

async fn reply(h: &Harness, participant: &str, action: VoteAction, vote_id: &str) -> VoteStatus {
    h.provider
        .reply()
        .reply(action, None, participant, vote_id)
        .await
        .unwrap()
        .status
}

#[tokio::test]
async fn unanimous_approval_fires_once() {
    let h = harness(hub(&["a", "b", "c"]), &["a", "b", "c"]);
    let v1 = propose_project(&h, "a", &["b", "c"]).await;

    assert_eq!(reply(&h, "a", APPROVED, &v1).await, VoteStatus::Pending);
    assert_eq!(reply(&h, "b", APPROVED, &v1).await, VoteStatus::Pending);
    assert_eq!(h.executor.count(&v1), 0);

    assert_eq!(reply(&h, "c", APPROVED, &v1).await, VoteStatus::Approved);
    assert_eq!(h.executor.count(&v1), 1);
    assert_eq!(
        h.store.get_request(&v1).unwrap().unwrap().status,
        VoteStatus::Approved
    );

    // neither a repeated reply nor an explicit settlement runs the action again
    assert_eq!(reply(&h, "c", APPROVED, &v1).await, VoteStatus::Approved);
    assert_eq!(
        h.provider.reply().settle(&v1).await.unwrap(),
        VoteStatus::Approved
    );
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn rejection_keeps_vote_pending() {
    let h = harness(hub(&["a", "b", "c"]), &["a", "b", "c"]);
    let v1 = propose_project(&h, "a", &["b", "c"]).await;

    reply(&h, "a", APPROVED, &v1).await;
    reply(&h, "b", APPROVED, &v1).await;
    assert_eq!(reply(&h, "c", REJECTED, &v1).await, VoteStatus::Pending);
    assert_eq!(h.executor.count(&v1), 0);

    // c changes its mind
    assert_eq!(reply(&h, "c", APPROVED, &v1).await, VoteStatus::Approved);
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn replying_again_overwrites() {
    let h = harness(hub(&["a", "b"]), &["a", "b"]);
    let v1 = propose_project(&h, "a", &["b"]).await;

    h.provider
        .reply()
        .reply(REJECTED, Some("not yet".into()), "b", &v1)
        .await
        .unwrap();
    h.provider
        .reply()
        .reply(APPROVED, Some("fine".into()), "b", &v1)
        .await
        .unwrap();

    let invites = h.store.invites_of(&v1).unwrap();
    assert_eq!(invites.len(), 2);

    let invite = h.store.get_invite(&v1, "b").unwrap().unwrap();
    assert_eq!(invite.action, Some(APPROVED));
    assert_eq!(invite.reason.as_deref(), Some("fine"));

    assert_eq!(invite.revision, 2);

    let request = h.store.get_request(&v1).unwrap().unwrap();
    assert!(request.party_vote_info["b"].is_approved());
    assert_eq!(request.party_vote_info["b"].revision, 2);
}

#[tokio::test]
async fn settled_votes_ignore_replies() {
    let h = harness(hub(&["a", "b"]), &["a", "b"]);
    let v1 = propose_project(&h, "a", &["b"]).await;
    reply(&h, "a", APPROVED, &v1).await;
    assert_eq!(reply(&h, "b", APPROVED, &v1).await, VoteStatus::Approved);

    let request_before = h.store.get_request(&v1).unwrap().unwrap();
    let invite_before = h.store.get_invite(&v1, "b").unwrap().unwrap();

    let outcome = h
        .provider
        .reply()
        .reply(REJECTED, Some("too late".into()), "b", &v1)
        .await
        .unwrap();
    assert_eq!(outcome.status, VoteStatus::Approved);
    assert!(outcome.dispatch.deliveries.is_empty());

    assert_eq!(h.store.get_request(&v1).unwrap().unwrap(), request_before);
    assert_eq!(h.store.get_invite(&v1, "b").unwrap().unwrap(), invite_before);
    let detail = h.provider.reply().vote_detail("b", &v1).unwrap();
    assert_eq!(detail.own_action, Some(APPROVED));
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn signed_reply_verifies() {
    let h = harness(hub(&["a", "b"]), &["a", "b"]);
    let v1 = propose_project(&h, "a", &["b"]).await;
    reply(&h, "b", APPROVED, &v1).await;

    let request = h.store.get_request(&v1).unwrap().unwrap();
    let initiator_signature = request.request_payload.initiator_signature().unwrap();
    let invite = h.store.get_invite(&v1, "b").unwrap().unwrap();

    let payload = invite.reply_payload.as_ref().unwrap();
    assert_eq!(payload.cert_chain.len(), 1);
    assert_eq!(payload.cert_chain[0].as_ref(), b"certificate");
    let body = payload.decode_body().unwrap();
    assert_eq!(body.vote_request_id, v1);
    assert_eq!(body.voter, "b");

    let public_key = KEY.to_public_key();
    verify_reply(&invite, initiator_signature, &public_key).unwrap();

    // bound to the initiator signature
    assert!(verify_reply(&invite, "b3RoZXI=", &public_key).is_err());

    // bound to the recorded action
    let mut tampered = invite.clone();
    tampered.action = Some(REJECTED);
    assert!(verify_reply(&tampered, initiator_signature, &public_key).is_err());
}

#[tokio::test]
async fn unknown_votes_and_voters() {
    let h = harness(hub(&["a", "b", "mallory"]), &["a", "b", "mallory"]);
    let v1 = propose_project(&h, "a", &["b"]).await;

    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "a", "nope").await,
        Err(ApprovalError::NotFound(_))
    ));
    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "mallory", &v1).await,
        Err(ApprovalError::UnauthorizedVoter { .. })
    ));
    assert!(h.store.get_invite(&v1, "mallory").unwrap().is_none());
}

#[tokio::test]
async fn missing_credentials_fail_the_reply() {
    let h = harness(hub(&["a", "b"]), &["a"]);
    let v1 = propose_project(&h, "a", &["b"]).await;

    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "b", &v1).await,
        Err(ApprovalError::Credentials { .. })
    ));
    assert!(h.store.get_invite(&v1, "b").unwrap().unwrap().action.is_none());
}

#[tokio::test]
async fn identity_guard_never_mutates() {
    let h = harness(StaticTopology::new(Topology::Autonomy, "alice"), &["alice", "bob"]);
    let v1 = propose_project(&h, "alice", &["bob"]).await;
    let request_before = h.store.get_request(&v1).unwrap().unwrap();

    for action in [APPROVED, REJECTED] {
        let err = h
            .provider
            .reply()
            .reply(action, None, "bob", &v1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::IdentityMismatch { .. }));
    }

    assert_eq!(h.store.get_request(&v1).unwrap().unwrap(), request_before);
    assert!(h.store.get_invite(&v1, "bob").unwrap().unwrap().action.is_none());
    assert!(h.transport.pushed().is_empty());
}

#[tokio::test]
async fn signing_waits_for_initiator_signature() {
    let h = harness(hub(&["a", "b"]), &["a", "b"]);
    let v1 = propose_project(&h, "a", &["b"]).await;

    // the proposal arrived before its signature
    let mut request = h.store.get_request(&v1).unwrap().unwrap();
    let signature = request.request_payload.signature.take();
    h.store.upsert_request(request.clone()).unwrap();
    let invite_before = h.store.get_invite(&v1, "b").unwrap().unwrap();

    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "b", &v1).await,
        Err(ApprovalError::NotSynchronized(id)) if id == v1
    ));
    assert_eq!(h.store.get_invite(&v1, "b").unwrap().unwrap(), invite_before);

    // an empty signature is no signature either
    request.request_payload.signature = Some(String::new());
    h.store.upsert_request(request.clone()).unwrap();
    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "b", &v1).await,
        Err(ApprovalError::NotSynchronized(_))
    ));

    request.request_payload.signature = signature;
    h.provider
        .reply()
        .accept_sync(SyncPayload::VoteRequest(request))
        .await
        .unwrap();
    assert_eq!(reply(&h, "b", APPROVED, &v1).await, VoteStatus::Pending);
}

#[tokio::test]
async fn route_executor_replies_unsigned() {
    let topology = hub(&["alice", "tee"]).with_non_signing("tee");
    let h = harness(topology, &["alice"]);

    let vote_id = h
        .provider
        .approval()
        .propose(
            VoteType::NodeRoute,
            "alice",
            json!({"srcParticipant": "alice", "dstParticipant": "tee", "dstAddress": "10.0.0.7:50051"}),
        )
        .await
        .unwrap();

    // the executor leg does not need the initiator signature nor credentials
    let mut request = h.store.get_request(&vote_id).unwrap().unwrap();
    let signature = request.request_payload.signature.take();
    h.store.upsert_request(request.clone()).unwrap();

    assert_eq!(reply(&h, "tee", APPROVED, &vote_id).await, VoteStatus::Pending);
    let invite = h.store.get_invite(&vote_id, "tee").unwrap().unwrap();
    assert_eq!(invite.action, Some(APPROVED));
    assert!(invite.reply_payload.is_none());

    // the signing end still has to approve
    assert!(h.store.get_route("alice->tee").unwrap().is_none());
    request.request_payload.signature = signature;
    h.store.upsert_request(request).unwrap();

    assert_eq!(reply(&h, "alice", APPROVED, &vote_id).await, VoteStatus::Approved);
    assert!(h
        .store
        .get_invite(&vote_id, "alice")
        .unwrap()
        .unwrap()
        .reply_payload
        .is_some());
    assert_eq!(
        h.store.get_route("alice->tee").unwrap().unwrap().status,
        RouteStatus::Succeeded
    );
    assert_eq!(h.executor.count(&vote_id), 1);
}

#[tokio::test]
async fn exemption_is_limited_to_routes() {
    let topology = hub(&["alice", "tee"]).with_non_signing("tee");
    let h = harness(topology, &["alice"]);

    let vote_id = h
        .provider
        .approval()
        .propose(
            VoteType::TeeDownload,
            "alice",
            json!({"datatableId": "dt-9", "teeParticipant": "tee", "owner": "alice"}),
        )
        .await
        .unwrap();

    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "tee", &vote_id).await,
        Err(ApprovalError::Credentials { .. })
    ));
}

#[tokio::test]
async fn edge_forwards_to_hub() {
    let topology = StaticTopology::new(Topology::Participant, "alice")
        .with_hub("center")
        .with_participant("center", url("http://center/json_rpc"), None);
    let h = harness(topology, &["alice"]);
    let v1 = propose_project(&h, "alice", &["bob"]).await;

    let outcome = h
        .provider
        .reply()
        .reply(APPROVED, None, "alice", &v1)
        .await
        .unwrap();
    assert_eq!(outcome.status, VoteStatus::Pending);

    // not committed locally
    assert!(h.store.get_invite(&v1, "alice").unwrap().unwrap().action.is_none());

    let pushed = h.transport.pushed();
    assert_eq!(pushed.len(), 1);
    let (endpoint, payload) = &pushed[0];
    assert_eq!(endpoint.as_str(), "http://center/json_rpc");
    match payload {
        SyncPayload::VoteInvite(invite) => {
            assert_eq!(invite.participant_id, "alice");
            assert_eq!(invite.action, Some(APPROVED));
            assert!(invite.reply_payload.is_some());
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_hub_fails_the_reply() {
    let topology = StaticTopology::new(Topology::Participant, "alice")
        .with_hub("center")
        .with_participant("center", url("http://center/json_rpc"), None);
    let h = harness_with(
        topology,
        &["alice"],
        RecordingTransport::failing(&["http://center/json_rpc"]),
    );
    let v1 = propose_project(&h, "alice", &["bob"]).await;

    assert!(matches!(
        h.provider.reply().reply(APPROVED, None, "alice", &v1).await,
        Err(ApprovalError::HubUnreachable { hub, .. }) if hub == "center"
    ));
}

#[tokio::test]
async fn hub_settles_forwarded_replies() {
    let h = harness(hub(&["alice"]), &["alice", "bob"]);
    let v1 = propose_project(&h, "alice", &["bob"]).await;
    reply(&h, "alice", APPROVED, &v1).await;

    let mut invite = h.store.get_invite(&v1, "bob").unwrap().unwrap();
    invite.action = Some(APPROVED);
    invite.modified_at = Utc::now() + Duration::seconds(1);

    let status = h
        .provider
        .reply()
        .accept_sync(SyncPayload::VoteInvite(invite.clone()))
        .await
        .unwrap();
    assert_eq!(status, Some(VoteStatus::Approved));
    assert_eq!(h.executor.count(&v1), 1);

    // duplicate delivery
    h.provider
        .reply()
        .accept_sync(SyncPayload::VoteInvite(invite))
        .await
        .unwrap();
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn remote_reply_survives_clock_skew() {
    let h = harness(hub(&["a", "b"]), &["a", "b"]);
    let v1 = propose_project(&h, "a", &["b", "c"]).await;
    reply(&h, "a", APPROVED, &v1).await;
    assert_eq!(reply(&h, "b", APPROVED, &v1).await, VoteStatus::Pending);

    // c's clock runs behind the hub's
    let created_at = h.store.get_request(&v1).unwrap().unwrap().created_at;
    let mut invite = h.store.get_invite(&v1, "c").unwrap().unwrap();
    invite.action = Some(APPROVED);
    invite.modified_at = created_at - Duration::seconds(30);

    let status = h
        .provider
        .reply()
        .accept_sync(SyncPayload::VoteInvite(invite))
        .await
        .unwrap();
    assert_eq!(status, Some(VoteStatus::Approved));
    assert!(h.store.get_invite(&v1, "c").unwrap().unwrap().is_approved());
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn sync_from_non_voters_is_refused() {
    let topology = StaticTopology::new(Topology::Autonomy, "alice")
        .with_participant("bob", url("http://bob/json_rpc"), None);
    let h = harness(topology, &["alice"]);
    let v1 = propose_project(&h, "alice", &["bob"]).await;

    let mut mallory = VoteInvite::new(&v1, "mallory", Utc::now());
    mallory.action = Some(REJECTED);
    assert!(matches!(
        h.provider
            .reply()
            .accept_sync(SyncPayload::VoteInvite(mallory))
            .await,
        Err(ApprovalError::UnauthorizedVoter { participant, .. }) if participant == "mallory"
    ));

    assert_eq!(reply(&h, "alice", APPROVED, &v1).await, VoteStatus::Pending);
    let mut bob = VoteInvite::new(&v1, "bob", Utc::now());
    bob.action = Some(APPROVED);
    bob.revision = 1;
    assert_eq!(
        h.provider
            .reply()
            .accept_sync(SyncPayload::VoteInvite(bob))
            .await
            .unwrap(),
        Some(VoteStatus::Approved)
    );

    let request = h.store.get_request(&v1).unwrap().unwrap();
    assert_eq!(
        request.party_vote_info.keys().collect::<Vec<_>>(),
        vec!["alice", "bob"]
    );
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn peers_converge_without_hub() {
    let topology = StaticTopology::new(Topology::Autonomy, "alice")
        .with_participant("bob", url("http://bob/json_rpc"), None)
        .with_participant("carol", url("http://carol/json_rpc"), None);
    let h = harness(topology, &["alice"]);
    let v1 = propose_project(&h, "alice", &["bob", "carol"]).await;

    let outcome = h
        .provider
        .reply()
        .reply(APPROVED, None, "alice", &v1)
        .await
        .unwrap();
    assert_eq!(outcome.status, VoteStatus::Pending);
    // request and invite to both peers
    assert_eq!(outcome.dispatch.deliveries.len(), 4);
    assert!(outcome.dispatch.is_complete());

    // bob's copy of the request, carrying his own reply
    let mut bob_copy = h.store.get_request(&v1).unwrap().unwrap();
    bob_copy
        .party_vote_info
        .insert("alice".into(), approval_sdk::PartyVoteInfo::unanswered(bob_copy.created_at));
    bob_copy.record_party_vote("bob", APPROVED, None, Utc::now());
    assert_eq!(
        h.provider
            .reply()
            .accept_sync(SyncPayload::VoteRequest(bob_copy))
            .await
            .unwrap(),
        Some(VoteStatus::Pending)
    );
    let request = h.store.get_request(&v1).unwrap().unwrap();
    assert!(request.party_vote_info["alice"].is_approved());
    assert!(request.party_vote_info["bob"].is_approved());

    let mut carol = VoteInvite::new(&v1, "carol", Utc::now());
    carol.action = Some(APPROVED);
    carol.modified_at = Utc::now() + Duration::seconds(1);
    assert_eq!(
        h.provider
            .reply()
            .accept_sync(SyncPayload::VoteInvite(carol))
            .await
            .unwrap(),
        Some(VoteStatus::Approved)
    );
    assert_eq!(h.executor.count(&v1), 1);
}

#[tokio::test]
async fn peer_fan_out_failures_are_not_fatal() {
    let topology = StaticTopology::new(Topology::Autonomy, "alice")
        .with_participant("bob", url("http://bob/json_rpc"), None)
        .with_participant("carol", url("http://carol/json_rpc"), None);
    let h = harness_with(
        topology,
        &["alice"],
        RecordingTransport::failing(&["http://bob/json_rpc"]),
    );
    let v1 = propose_project(&h, "alice", &["bob", "carol"]).await;

    let outcome = h
        .provider
        .reply()
        .reply(APPROVED, None, "alice", &v1)
        .await
        .unwrap();

    assert_eq!(outcome.dispatch.failures().count(), 2);
    assert!(outcome
        .dispatch
        .failures()
        .all(|d| d.destination == "bob"));
    assert_eq!(h.transport.pushed().len(), 2);
    assert!(h
        .store
        .get_invite(&v1, "alice")
        .unwrap()
        .unwrap()
        .is_approved());
}

#[tokio::test]
async fn listing_and_detail() {
    let h = harness(hub(&["a", "b", "c"]), &["a", "b", "c"]);
    let first = propose_project(&h, "a", &["b"]).await;
    let second = propose_project(&h, "c", &["a"]).await;
    reply(&h, "b", APPROVED, &first).await;

    let listed = h
        .provider
        .reply()
        .list_votes("a")
        .unwrap()
        .into_iter()
        .map(|m| m.vote_id)
        .collect::<Vec<_>>();
    assert_eq!(listed, vec![second.clone(), first.clone()]);

    let listed = h.provider.reply().list_votes("b").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].vote_id, first);

    let detail = h.provider.reply().vote_detail("b", &first).unwrap();
    assert!(!detail.is_initiator);
    assert_eq!(detail.own_action, Some(APPROVED));
    assert!(detail.parties.iter().any(|p| p.participant_id == "b" && p.signed));

    assert!(h.provider.reply().vote_detail("a", &first).unwrap().is_initiator);
    assert!(matches!(
        h.provider.reply().vote_detail("c", &first),
        Err(ApprovalError::UnauthorizedVoter { .. })
    ));
}

#[tokio::test]
async fn concurrent_replies_are_not_lost() {
    let voters = ["p0", "p1", "p2", "p3", "p4", "p5"];
    let h = std::sync::Arc::new(harness(
        StaticTopology::new(Topology::Hub, "center"),
        &voters,
    ));
    let v1 = propose_project(&h, "p0", &voters[1..]).await;

    let tasks = voters
        .iter()
        .map(|p| {
            let h = h.clone();
            let v1 = v1.clone();
            let p = p.to_string();
            tokio::spawn(async move {
                h.provider
                    .reply()
                    .reply(APPROVED, None, &p, &v1)
                    .await
                    .unwrap()
            })
        })
        .collect::<Vec<_>>();
    for t in tasks {
        t.await.unwrap();
    }

    let request = h.store.get_request(&v1).unwrap().unwrap();
    assert_eq!(request.status, VoteStatus::Approved);
    assert!(request.all_parties_approved());
    assert_eq!(h.executor.count(&v1), 1);
}

/// A sequence of replies, as indices into the voters of a vote.
#[derive(Clone, Debug)]
struct Replies {
    voters: usize,
    replies: Vec<(usize, bool)>,
}

impl Arbitrary for Replies {
    fn arbitrary(g: &mut Gen) -> Self {
        let voters = 1 + usize::arbitrary(g) % 4;
        let len = usize::arbitrary(g) % 9;
        let replies = (0..len)
            .map(|_| (usize::arbitrary(g) % voters, bool::arbitrary(g)))
            .collect();
        Self { voters, replies }
    }
}

fn quorum_fires_iff_all_approved(input: Replies) -> bool {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async move {
        let voters = (0..input.voters).map(|i| format!("p{i}")).collect::<Vec<_>>();
        let names = voters.iter().map(String::as_str).collect::<Vec<_>>();
        let h = harness(StaticTopology::new(Topology::Hub, "center"), &names);
        let vote_id = propose_project(&h, &voters[0], &names[1..]).await;

        let mut latest = HashMap::new();
        let mut approved = false;
        for (voter, approve) in input.replies {
            let action = if approve { APPROVED } else { REJECTED };
            let status = reply(&h, &voters[voter], action, &vote_id).await;

            latest.insert(voter, approve);
            approved |= (0..input.voters).all(|v| latest.get(&v) == Some(&true));

            let expected = if approved {
                VoteStatus::Approved
            } else {
                VoteStatus::Pending
            };
            if status != expected || h.executor.count(&vote_id) != usize::from(approved) {
                return false;
            }
        }
        true
    })
}

#[test]
fn quorum_property() {
    QuickCheck::new()
        .tests(25)
        .quickcheck(quorum_fires_iff_all_approved as fn(Replies) -> bool);
}
