// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Fixtures shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use approval_identity::{generate_private_key, Credentials, MemoryCredentialStore, RsaPrivateKey};
use approval_sdk::{
    PartyVoteInfo, ProposalBody, ProposalPayload, SyncPayload, VoteRequest, VoteStatus, VoteType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use url::Url;

use crate::registry::{ActionExecutor, HandlerContext};
use crate::store::MemoryVoteStore;
use crate::sync::SyncTransport;
use crate::topology::{StaticTopology, Topology};
use crate::ApprovalProvider;

lazy_static! {
    // key generation is slow in debug builds, every participant shares one key
    pub static ref KEY: RsaPrivateKey = generate_private_key(1024).unwrap();
}

/// base64 of "certificate"
pub const CERT: &str = "Y2VydGlmaWNhdGU=";

pub fn url(s: &str) -> Url {
    s.parse().unwrap()
}

/// Records successful pushes, fails pushes to the given endpoints.
#[derive(Default)]
pub struct RecordingTransport {
    pushed: Mutex<Vec<(Url, SyncPayload)>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn failing(endpoints: &[&str]) -> Self {
        Self {
            pushed: Mutex::new(vec![]),
            failing: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn pushed(&self) -> Vec<(Url, SyncPayload)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncTransport for RecordingTransport {
    async fn push(&self, endpoint: &Url, payload: &SyncPayload) -> anyhow::Result<()> {
        if self.failing.contains(endpoint.as_str()) {
            return Err(anyhow!("connection refused"));
        }
        self.pushed
            .lock()
            .unwrap()
            .push((endpoint.clone(), payload.clone()));
        Ok(())
    }
}

/// Counts executions per vote.
#[derive(Default)]
pub struct CountingExecutor {
    counts: Mutex<HashMap<String, usize>>,
    failure: Mutex<Option<String>>,
}

impl CountingExecutor {
    pub fn count(&self, vote_id: &str) -> usize {
        self.counts
            .lock()
            .unwrap()
            .get(vote_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }
}

#[async_trait]
impl ActionExecutor for CountingExecutor {
    async fn execute(&self, request: &VoteRequest) -> anyhow::Result<()> {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(request.vote_id.clone())
            .or_default() += 1;

        match self.failure.lock().unwrap().as_ref() {
            Some(reason) => Err(anyhow!(reason.clone())),
            None => Ok(()),
        }
    }
}

pub fn handler_context(mode: Topology, local: &str) -> (HandlerContext, Arc<CountingExecutor>) {
    handler_context_with(StaticTopology::new(mode, local))
}

pub fn handler_context_with(topology: StaticTopology) -> (HandlerContext, Arc<CountingExecutor>) {
    let executor = Arc::new(CountingExecutor::default());
    let ctx = HandlerContext {
        store: Arc::new(MemoryVoteStore::new()),
        topology: Arc::new(topology),
        executor: executor.clone(),
    };
    (ctx, executor)
}

/// A pending project vote without initiator signature.
pub fn unsigned_request(
    vote_id: &str,
    initiator: &str,
    voters: &[&str],
    at: DateTime<Utc>,
) -> VoteRequest {
    let voters = voters.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    let body = ProposalBody::new(voters.clone(), Default::default());

    VoteRequest {
        vote_id: vote_id.to_string(),
        vote_type: VoteType::ProjectCreate,
        initiator: initiator.to_string(),
        executors: vec![initiator.to_string()],
        request_payload: ProposalPayload::unsigned(&body).unwrap(),
        status: VoteStatus::Pending,
        party_vote_info: voters
            .into_iter()
            .map(|v| (v, PartyVoteInfo::unanswered(at)))
            .collect(),
        created_at: at,
        modified_at: at,
    }
}

pub struct Harness {
    pub provider: ApprovalProvider,
    pub store: Arc<MemoryVoteStore>,
    pub transport: Arc<RecordingTransport>,
    pub executor: Arc<CountingExecutor>,
}

/// A provider over in-memory collaborators, holding [`KEY`] credentials for `signers`.
pub fn harness(topology: StaticTopology, signers: &[&str]) -> Harness {
    harness_with(topology, signers, RecordingTransport::default())
}

pub fn harness_with(
    topology: StaticTopology,
    signers: &[&str],
    transport: RecordingTransport,
) -> Harness {
    let credentials = MemoryCredentialStore::new();
    for s in signers {
        credentials.insert(s, Credentials::new(KEY.clone(), vec![CERT.to_string()]));
    }

    let store = Arc::new(MemoryVoteStore::new());
    let transport = Arc::new(transport);
    let executor = Arc::new(CountingExecutor::default());
    let provider = ApprovalProvider::new(
        store.clone(),
        Arc::new(credentials),
        Arc::new(topology),
        transport.clone(),
        executor.clone(),
    );

    Harness {
        provider,
        store,
        transport,
        executor,
    }
}
