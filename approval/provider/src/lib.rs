// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The multi-party approval protocol.
//!
//! An action proposed by one participant only takes effect once every designated participant
//! countersigned its consent. [`ApprovalProvider`] wires the pieces together: the vote store, the
//! per-category handlers, the signing reply protocol and the topology-aware propagation of vote
//! records between participants.

use std::sync::Arc;

use anyhow::Result;
use approval_identity::{CredentialProvider, PersistentCredentialStore};

use crate::approval::ApprovalService;
use crate::config::Config;
use crate::lock::VoteLocks;
use crate::registry::{ActionExecutor, HandlerContext, LoggingExecutor, VoteTypeRegistry};
use crate::reply::ReplyService;
use crate::store::{MemoryVoteStore, PersistentVoteStore, VoteStore};
use crate::sync::{JsonRpcSyncTransport, SyncApplier, SyncDispatcher, SyncTransport};
use crate::topology::{StaticTopology, TopologyOracle};

pub mod approval;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod lock;
pub mod registry;
pub mod reply;
pub mod store;
pub mod sync;
pub mod topology;

#[cfg(test)]
mod testing;

pub use error::ApprovalError;

/// The entry point of the approval protocol for one process.
pub struct ApprovalProvider {
    approval: ApprovalService,
    reply: ReplyService,
    topology: Arc<dyn TopologyOracle>,
}

impl ApprovalProvider {
    pub fn new(
        store: Arc<dyn VoteStore>,
        credentials: Arc<dyn CredentialProvider>,
        topology: Arc<dyn TopologyOracle>,
        transport: Arc<dyn SyncTransport>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let locks = Arc::new(VoteLocks::new());
        let registry = Arc::new(VoteTypeRegistry::with_default_handlers(HandlerContext {
            store: store.clone(),
            topology: topology.clone(),
            executor,
        }));
        let applier = Arc::new(SyncApplier::new(store.clone(), locks.clone()));
        let dispatcher = Arc::new(SyncDispatcher::new(
            topology.clone(),
            transport,
            applier.clone(),
        ));

        let approval = ApprovalService::new(
            store.clone(),
            registry.clone(),
            credentials.clone(),
            topology.clone(),
            dispatcher.clone(),
            locks.clone(),
        );
        let reply = ReplyService::new(
            store,
            registry,
            credentials,
            topology.clone(),
            dispatcher,
            applier,
            locks,
        );

        Self {
            approval,
            reply,
            topology,
        }
    }

    /// Builds the provider described by `config`: file backed credentials, a JSON file vote store
    /// when a path is configured, JSON-RPC sync and a logging action executor.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn VoteStore> = match &config.store.path {
            Some(path) => Arc::new(PersistentVoteStore::new(path.clone())?),
            None => {
                log::warn!("no store path configured, votes are kept in memory only");
                Arc::new(MemoryVoteStore::new())
            }
        };
        let credentials = Arc::new(PersistentCredentialStore::new(
            config.credentials.path.clone(),
        )?);
        let topology = Arc::new(StaticTopology::from_config(config));
        let transport = Arc::new(JsonRpcSyncTransport::new(config.sync.timeout()));

        log::info!(
            "approval provider for {} running in {} mode",
            config.topology.local_participant,
            config.topology.mode
        );

        Ok(Self::new(
            store,
            credentials,
            topology,
            transport,
            Arc::new(LoggingExecutor),
        ))
    }

    pub fn approval(&self) -> &ApprovalService {
        &self.approval
    }

    pub fn reply(&self) -> &ReplyService {
        &self.reply
    }

    pub fn topology(&self) -> &dyn TopologyOracle {
        self.topology.as_ref()
    }
}
