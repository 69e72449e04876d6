// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Records created once a vote is approved and replicated like the votes themselves.

use crate::vote::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A network route from one participant to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRoute {
    pub route_id: String,
    pub src_participant: ParticipantId,
    pub dst_participant: ParticipantId,
    pub dst_address: String,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NodeRoute {
    pub fn route_id_of(src: &str, dst: &str) -> String {
        format!("{src}->{dst}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeJobKind {
    Push,
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeJobStatus {
    Running,
    Success,
    Failed,
}

/// Tracks a datatable moved in or out of a TEE participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeDatatableManagement {
    pub management_id: String,
    pub datatable_id: String,
    pub tee_participant: ParticipantId,
    pub owner: ParticipantId,
    pub kind: TeeJobKind,
    pub status: TeeJobStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
