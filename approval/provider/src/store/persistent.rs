// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

//! Vote store persisted as a JSON snapshot, rewritten after every write.

use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use approval_sdk::{NodeRoute, TeeDatatableManagement, VoteInvite, VoteRequest};

use crate::store::memory::{MemoryVoteStore, Snapshot};
use crate::store::VoteStore;

pub struct PersistentVoteStore {
    memory: MemoryVoteStore,
    file_path: PathBuf,
    /// Serializes writes so an older snapshot never overwrites a newer one.
    write_lock: Mutex<()>,
}

impl PersistentVoteStore {
    /// Loads the store at `path`. A missing file is an empty store.
    pub fn new(path: PathBuf) -> Result<Self> {
        let memory = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let snapshot: Snapshot = serde_json::from_reader(reader)
                .map_err(|e| anyhow!("failed to deserialize votes at: {:?} due to: {e:}", path))?;
            MemoryVoteStore::from_snapshot(snapshot)
        } else {
            MemoryVoteStore::new()
        };

        log::debug!("vote store loaded from {:?}", path);

        Ok(Self {
            memory,
            file_path: path,
            write_lock: Mutex::new(()),
        })
    }

    /// Runs `write` against a copy of the store and persists the copy. The copy replaces the
    /// in-memory state only once the file is written, so a failed write changes nothing. `write`
    /// returns false when it left the store unchanged, which skips the file.
    fn write_through(&self, write: impl FnOnce(&MemoryVoteStore) -> Result<bool>) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap();

        let staged = MemoryVoteStore::from_snapshot(self.memory.snapshot());
        if !write(&staged)? {
            return Ok(false);
        }

        let snapshot = staged.snapshot();
        self.write_file(&snapshot)?;
        self.memory.restore(snapshot);
        Ok(true)
    }

    fn write_file(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = self
            .file_path
            .parent()
            .ok_or_else(|| anyhow!("vote store parent path not exists"))?;
        fs::create_dir_all(dir)?;

        let file = File::create(&self.file_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, snapshot)
            .map_err(|e| anyhow!("failed to serialize and write votes: {e}"))?;

        Ok(())
    }
}

impl VoteStore for PersistentVoteStore {
    fn create_vote(&self, request: VoteRequest, invites: Vec<VoteInvite>) -> Result<bool> {
        self.write_through(|staged| staged.create_vote(request, invites))
    }

    fn get_request(&self, vote_id: &str) -> Result<Option<VoteRequest>> {
        self.memory.get_request(vote_id)
    }

    fn upsert_request(&self, request: VoteRequest) -> Result<()> {
        self.write_through(|staged| staged.upsert_request(request).map(|_| true))?;
        Ok(())
    }

    fn list_requests(&self) -> Result<Vec<VoteRequest>> {
        self.memory.list_requests()
    }

    fn get_invite(&self, vote_id: &str, participant: &str) -> Result<Option<VoteInvite>> {
        self.memory.get_invite(vote_id, participant)
    }

    fn upsert_invite(&self, invite: VoteInvite) -> Result<()> {
        self.write_through(|staged| staged.upsert_invite(invite).map(|_| true))?;
        Ok(())
    }

    fn invites_of(&self, vote_id: &str) -> Result<Vec<VoteInvite>> {
        self.memory.invites_of(vote_id)
    }

    fn get_route(&self, route_id: &str) -> Result<Option<NodeRoute>> {
        self.memory.get_route(route_id)
    }

    fn upsert_route(&self, route: NodeRoute) -> Result<()> {
        self.write_through(|staged| staged.upsert_route(route).map(|_| true))?;
        Ok(())
    }

    fn get_tee_datatable_management(
        &self,
        management_id: &str,
    ) -> Result<Option<TeeDatatableManagement>> {
        self.memory.get_tee_datatable_management(management_id)
    }

    fn upsert_tee_datatable_management(&self, record: TeeDatatableManagement) -> Result<()> {
        self.write_through(|staged| staged.upsert_tee_datatable_management(record).map(|_| true))?;
        Ok(())
    }
}
