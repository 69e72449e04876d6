// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Signed proposal and reply payloads.
//!
//! Bodies travel as base64 encoded JSON. Signatures are base64 encoded as well and are computed
//! over the UTF-8 bytes of the encoded text, never over the raw JSON.

use crate::vote::{ParticipantId, VoteAction, VoteId};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_json_base64<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value)?;
    Ok(BASE64.encode(json))
}

pub fn decode_json_base64<T: DeserializeOwned>(encoded: &str) -> Result<T, CodecError> {
    let raw = BASE64.decode(encoded)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// The proposal body: the voters plus whatever the vote category needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalBody {
    pub voters: Vec<ParticipantId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProposalBody {
    pub fn new(voters: Vec<ParticipantId>, fields: Map<String, Value>) -> Self {
        Self { voters, fields }
    }

    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.fields
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// The proposal as stored on the vote request. `signature` is the initiator's signature over
/// `body` and stays empty until it has reached this participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub body: String,
    pub signature: Option<String>,
}

impl ProposalPayload {
    pub fn unsigned(body: &ProposalBody) -> Result<Self, CodecError> {
        Ok(Self {
            body: encode_json_base64(body)?,
            signature: None,
        })
    }

    pub fn decode_body(&self) -> Result<ProposalBody, CodecError> {
        decode_json_base64(&self.body)
    }

    pub fn initiator_signature(&self) -> Option<&str> {
        self.signature.as_deref().filter(|s| !s.is_empty())
    }
}

/// What a voter countersigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    pub vote_request_id: VoteId,
    pub voter: ParticipantId,
    pub action: VoteAction,
}

impl ReplyBody {
    pub fn encode(&self) -> Result<String, CodecError> {
        encode_json_base64(self)
    }

    /// The text a voter signs: its encoded body followed by the initiator's signature.
    pub fn signing_input(encoded_body: &str, initiator_signature: &str) -> String {
        format!("{encoded_body}{initiator_signature}")
    }
}

/// The stored reply of a signing voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedReply {
    /// Base64 encoded [`ReplyBody`].
    pub body: String,
    /// Base64 SHA-256withRSA signature over [`ReplyBody::signing_input`].
    pub signature: String,
    /// Decoded certificates, leaf first.
    pub cert_chain: Vec<ByteBuf>,
}

impl SignedReply {
    pub fn decode_body(&self) -> Result<ReplyBody, CodecError> {
        decode_json_base64(&self.body)
    }
}
