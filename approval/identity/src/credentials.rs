// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use crate::CredentialError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::RsaPrivateKey;

/// The signing material of one participant.
#[derive(Clone)]
pub struct Credentials {
    pub private_key: RsaPrivateKey,
    /// Base64 encoded DER certificates, leaf first.
    pub cert_chain: Vec<String>,
}

impl Credentials {
    pub fn new(private_key: RsaPrivateKey, cert_chain: Vec<String>) -> Self {
        Self {
            private_key,
            cert_chain,
        }
    }

    /// The certificate chain with every certificate base64 decoded.
    pub fn decoded_cert_chain(&self) -> Result<Vec<Vec<u8>>, CredentialError> {
        self.cert_chain
            .iter()
            .map(|c| BASE64.decode(c).map_err(CredentialError::from))
            .collect()
    }
}

/// Gives out the signing key and certificate chain used to authenticate a participant's replies.
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self, participant: &str) -> anyhow::Result<Credentials>;
}
