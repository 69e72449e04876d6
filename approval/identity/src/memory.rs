// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use crate::{CredentialError, CredentialProvider, Credentials};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryCredentialStore {
    pub(crate) data: RwLock<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, participant: &str, credentials: Credentials) {
        self.data
            .write()
            .unwrap()
            .insert(participant.to_string(), credentials);
    }

    pub fn participants(&self) -> Vec<String> {
        self.data.read().unwrap().keys().cloned().collect()
    }
}

impl CredentialProvider for MemoryCredentialStore {
    fn credentials(&self, participant: &str) -> anyhow::Result<Credentials> {
        let data = self.data.read().unwrap();
        data.get(participant)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(participant.to_string()).into())
    }
}
