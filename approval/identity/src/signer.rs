// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! SHA-256withRSA (PKCS#1 v1.5) over UTF-8 text, signatures exchanged as base64.

use crate::SignatureError;
use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Signs `message` and returns the base64 encoded signature.
pub fn sign(private_key: &RsaPrivateKey, message: &str) -> anyhow::Result<String> {
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key
        .try_sign(message.as_bytes())
        .map_err(|e| anyhow!("cannot sign message: {e}"))?;
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Checks a base64 encoded signature produced by [`sign`].
pub fn verify(
    public_key: &RsaPublicKey,
    message: &str,
    signature_b64: &str,
) -> Result<(), SignatureError> {
    let raw = BASE64.decode(signature_b64)?;
    let signature = Signature::try_from(raw.as_slice())?;
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    verifying_key.verify(message.as_bytes(), &signature)?;
    Ok(())
}

/// Generates a fresh RSA key of `bits` size.
pub fn generate_private_key(bits: usize) -> anyhow::Result<RsaPrivateKey> {
    let mut rng = rand::rngs::OsRng;
    RsaPrivateKey::new(&mut rng, bits).map_err(|e| anyhow!("cannot generate rsa key: {e}"))
}
