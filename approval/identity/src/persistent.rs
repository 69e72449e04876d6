// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

//! Persistent file credential store

use crate::memory::MemoryCredentialStore;
use crate::{CredentialProvider, Credentials};
use anyhow::anyhow;
use anyhow::Result;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use zeroize::Zeroize;

pub struct PersistentCredentialStore {
    memory: MemoryCredentialStore,
    file_path: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct PersistentCredentials {
    participant: String,
    /// PKCS#8 PEM encoded private key
    private_key_pem: String,
    /// Base64 encoded certificates, leaf first
    #[serde(default)]
    cert_chain: Vec<String>,
}

impl Drop for PersistentCredentials {
    fn drop(&mut self) {
        self.private_key_pem.zeroize();
    }
}

impl CredentialProvider for PersistentCredentialStore {
    fn credentials(&self, participant: &str) -> Result<Credentials> {
        self.memory.credentials(participant)
    }
}

impl PersistentCredentialStore {
    /// Loads the store at `path`. A missing file is an empty store, created on first insert.
    pub fn new(path: PathBuf) -> Result<Self> {
        let memory = MemoryCredentialStore::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let persisted: Vec<PersistentCredentials> = serde_json::from_reader(reader)
                .map_err(|e| anyhow!("failed to deserialize credentials at: {:?} due to: {e:}", path))?;

            for p in persisted.iter() {
                let private_key = RsaPrivateKey::from_pkcs8_pem(&p.private_key_pem)
                    .map_err(|e| anyhow!("invalid private key for {}: {e}", p.participant))?;
                memory.insert(
                    &p.participant,
                    Credentials::new(private_key, p.cert_chain.clone()),
                );
            }
            log::debug!("loaded credentials of {} participants", persisted.len());
        }

        Ok(Self {
            memory,
            file_path: path,
        })
    }

    pub fn insert(&self, participant: &str, credentials: Credentials) -> Result<()> {
        self.memory.insert(participant, credentials);
        self.write_all()
    }

    pub fn participants(&self) -> Vec<String> {
        self.memory.participants()
    }

    fn write_all(&self) -> Result<()> {
        let dir = self
            .file_path
            .parent()
            .ok_or_else(|| anyhow!("credential store parent path not exists"))?;

        fs::create_dir_all(dir)?;

        let to_persist = {
            let data = self.memory.data.read().unwrap();
            let mut v = Vec::with_capacity(data.len());
            for (participant, c) in data.iter() {
                let pem = c
                    .private_key
                    .to_pkcs8_pem(LineEnding::LF)
                    .map_err(|e| anyhow!("cannot encode private key: {e}"))?;
                v.push(PersistentCredentials {
                    participant: participant.clone(),
                    private_key_pem: pem.to_string(),
                    cert_chain: c.cert_chain.clone(),
                });
            }
            v
        };

        let file = File::create(&self.file_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &to_persist)
            .map_err(|e| anyhow!("failed to serialize and write credentials: {e}"))?;

        Ok(())
    }
}
