// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("signature does not verify: {0}")]
    Invalid(#[from] rsa::signature::Error),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credentials for participant: {0}")]
    NotFound(String),
    #[error("certificate is not valid base64: {0}")]
    Certificate(#[from] base64::DecodeError),
}
