// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The envelope participants use to replicate records to each other.

use crate::record::{NodeRoute, TeeDatatableManagement};
use crate::vote::{VoteInvite, VoteRequest};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncDataType {
    VoteRequest,
    VoteInvite,
    NodeRoute,
    TeeDatatableManagement,
}

/// Serialized as `{"syncDataType": ..., "body": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "syncDataType",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum SyncPayload {
    VoteRequest(VoteRequest),
    VoteInvite(VoteInvite),
    NodeRoute(NodeRoute),
    TeeDatatableManagement(TeeDatatableManagement),
}

impl SyncPayload {
    pub fn data_type(&self) -> SyncDataType {
        match self {
            SyncPayload::VoteRequest(_) => SyncDataType::VoteRequest,
            SyncPayload::VoteInvite(_) => SyncDataType::VoteInvite,
            SyncPayload::NodeRoute(_) => SyncDataType::NodeRoute,
            SyncPayload::TeeDatatableManagement(_) => SyncDataType::TeeDatatableManagement,
        }
    }

    /// The vote this payload belongs to, if it is a vote record.
    pub fn vote_id(&self) -> Option<&str> {
        match self {
            SyncPayload::VoteRequest(r) => Some(&r.vote_id),
            SyncPayload::VoteInvite(i) => Some(&i.vote_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::VoteInvite;
    use chrono::Utc;
    use indoc::indoc;

    #[test]
    fn envelope_shape() {
        let invite = VoteInvite::new("V1", "bob", Utc::now());
        let payload = SyncPayload::VoteInvite(invite);

        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["syncDataType"], "VOTE_INVITE");
        assert_eq!(v["body"]["voteId"], "V1");
        assert_eq!(v["body"]["participantId"], "bob");
        assert_eq!(payload.vote_id(), Some("V1"));
        assert_eq!(payload.data_type().to_string(), "VOTE_INVITE");
    }

    #[test]
    fn parse_route_envelope() {
        let raw = indoc! {r#"
            {
                "syncDataType": "NODE_ROUTE",
                "body": {
                    "routeId": "alice->bob",
                    "srcParticipant": "alice",
                    "dstParticipant": "bob",
                    "dstAddress": "http://bob:8080",
                    "status": "SUCCEEDED",
                    "createdAt": "2023-05-01T00:00:00Z",
                    "modifiedAt": "2023-05-01T00:00:00Z"
                }
            }
        "#};

        let payload: SyncPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.data_type(), SyncDataType::NodeRoute);
        assert!(payload.vote_id().is_none());
        match payload {
            SyncPayload::NodeRoute(r) => assert_eq!(r.dst_participant, "bob"),
            _ => panic!("not a route"),
        }
    }
}
