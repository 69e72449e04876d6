// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::Result;
use approval_sdk::{NodeRoute, TeeDatatableManagement, VoteInvite, VoteRequest};
use serde::{Deserialize, Serialize};

use crate::store::VoteStore;

#[derive(Default)]
pub(crate) struct MemoryInner {
    requests: HashMap<String, VoteRequest>,
    invites: BTreeMap<(String, String), VoteInvite>,
    routes: HashMap<String, NodeRoute>,
    tee_management: HashMap<String, TeeDatatableManagement>,
}

impl From<Snapshot> for MemoryInner {
    fn from(snapshot: Snapshot) -> Self {
        MemoryInner {
            requests: snapshot
                .requests
                .into_iter()
                .map(|r| (r.vote_id.clone(), r))
                .collect(),
            invites: snapshot.invites.into_iter().map(|i| (i.key(), i)).collect(),
            routes: snapshot
                .routes
                .into_iter()
                .map(|r| (r.route_id.clone(), r))
                .collect(),
            tee_management: snapshot
                .tee_management
                .into_iter()
                .map(|r| (r.management_id.clone(), r))
                .collect(),
        }
    }
}

/// A flat copy of the store, used to persist it.
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snapshot {
    #[serde(default)]
    requests: Vec<VoteRequest>,
    #[serde(default)]
    invites: Vec<VoteInvite>,
    #[serde(default)]
    routes: Vec<NodeRoute>,
    #[serde(default)]
    tee_management: Vec<TeeDatatableManagement>,
}

#[derive(Default)]
pub struct MemoryVoteStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: RwLock::new(MemoryInner::from(snapshot)),
        }
    }

    /// Replaces the whole content of the store.
    pub(crate) fn restore(&self, snapshot: Snapshot) {
        *self.inner.write().unwrap() = MemoryInner::from(snapshot);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read().unwrap();
        Snapshot {
            requests: inner.requests.values().cloned().collect(),
            invites: inner.invites.values().cloned().collect(),
            routes: inner.routes.values().cloned().collect(),
            tee_management: inner.tee_management.values().cloned().collect(),
        }
    }
}

impl VoteStore for MemoryVoteStore {
    fn create_vote(&self, request: VoteRequest, invites: Vec<VoteInvite>) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        if inner.requests.contains_key(&request.vote_id) {
            return Ok(false);
        }
        for invite in invites {
            inner.invites.insert(invite.key(), invite);
        }
        inner.requests.insert(request.vote_id.clone(), request);
        Ok(true)
    }

    fn get_request(&self, vote_id: &str) -> Result<Option<VoteRequest>> {
        Ok(self.inner.read().unwrap().requests.get(vote_id).cloned())
    }

    fn upsert_request(&self, request: VoteRequest) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .requests
            .insert(request.vote_id.clone(), request);
        Ok(())
    }

    fn list_requests(&self) -> Result<Vec<VoteRequest>> {
        Ok(self.inner.read().unwrap().requests.values().cloned().collect())
    }

    fn get_invite(&self, vote_id: &str, participant: &str) -> Result<Option<VoteInvite>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .invites
            .get(&(vote_id.to_string(), participant.to_string()))
            .cloned())
    }

    fn upsert_invite(&self, invite: VoteInvite) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .invites
            .insert(invite.key(), invite);
        Ok(())
    }

    fn invites_of(&self, vote_id: &str) -> Result<Vec<VoteInvite>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .invites
            .range((vote_id.to_string(), String::new())..)
            .take_while(|((v, _), _)| v == vote_id)
            .map(|(_, i)| i.clone())
            .collect())
    }

    fn get_route(&self, route_id: &str) -> Result<Option<NodeRoute>> {
        Ok(self.inner.read().unwrap().routes.get(route_id).cloned())
    }

    fn upsert_route(&self, route: NodeRoute) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .routes
            .insert(route.route_id.clone(), route);
        Ok(())
    }

    fn get_tee_datatable_management(
        &self,
        management_id: &str,
    ) -> Result<Option<TeeDatatableManagement>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tee_management
            .get(management_id)
            .cloned())
    }

    fn upsert_tee_datatable_management(&self, record: TeeDatatableManagement) -> Result<()> {
        self.inner
            .write()
            .unwrap()
            .tee_management
            .insert(record.management_id.clone(), record);
        Ok(())
    }
}
