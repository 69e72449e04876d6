// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Key generation cli handler

use std::fmt::Debug;
use std::path::PathBuf;

use approval_identity::{generate_private_key, Credentials, PersistentCredentialStore};
use async_trait::async_trait;
use clap::Args;

use crate::{CommandLineHandler, GlobalArguments};

const DEFAULT_KEY_BITS: usize = 2048;

/// Generates a signing key for a participant into a credential store file. Works offline, the
/// daemon loads the store at startup.
pub(crate) struct KeyGen;

#[async_trait]
impl CommandLineHandler for KeyGen {
    type Arguments = KeyGenArgs;

    async fn handle(_global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("generate key with args: {:?}", arguments);
        generate_into_store(arguments)
    }
}

fn generate_into_store(arguments: &KeyGenArgs) -> anyhow::Result<()> {
    let store = PersistentCredentialStore::new(PathBuf::from(&arguments.store))?;
    if store.participants().contains(&arguments.participant) && !arguments.force {
        return Err(anyhow::anyhow!(
            "credentials of {} already exist, pass --force to replace them",
            arguments.participant
        ));
    }

    let credentials = Credentials::new(
        generate_private_key(arguments.bits)?,
        arguments.cert.clone(),
    );
    credentials.decoded_cert_chain()?;
    store.insert(&arguments.participant, credentials)?;

    log::info!(
        "generated {} bits key of {} into {}",
        arguments.bits,
        arguments.participant,
        arguments.store
    );
    Ok(())
}

#[derive(Debug, Args)]
#[command(about = "Generate the signing key of a participant into a credential store")]
pub(crate) struct KeyGenArgs {
    #[arg(long, short, help = "The credential store file")]
    pub store: String,
    #[arg(long, short, help = "The participant owning the key")]
    pub participant: String,
    #[arg(long, short, default_value_t = DEFAULT_KEY_BITS, help = "The RSA key size")]
    pub bits: usize,
    #[arg(long, short, help = "Base64 DER certificates of the key, leaf first")]
    pub cert: Vec<String>,
    #[arg(long, short, help = "Replace existing credentials of the participant")]
    pub force: bool,
}
