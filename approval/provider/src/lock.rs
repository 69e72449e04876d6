// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Per-vote mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per vote id. Every read-modify-write of a vote's records, local or
/// triggered by sync ingress, runs while holding it.
#[derive(Default)]
pub struct VoteLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl VoteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, vote_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            // drop locks nobody holds or waits for
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(vote_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
