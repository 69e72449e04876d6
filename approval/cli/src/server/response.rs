// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
use approval_provider::config::JSON_RPC_VERSION;
use approval_provider::ApprovalError;
use serde::{Deserialize, Serialize};

use crate::server::handlers::MethodNotSupported;

/// List of error codes for json rpc, see more: https://www.jsonrpc.org/specification#error_object
pub const INVALID_REQUEST_CODE: i32 = -32600;
pub const METHOD_NOT_FOUND_CODE: i32 = -32601;
pub const INVALID_PARAMS_CODE: i32 = -32602;
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Server error codes of the approval protocol, one per [`ApprovalError`] kind.
pub const NOT_FOUND_CODE: i32 = -32001;
pub const IDENTITY_MISMATCH_CODE: i32 = -32002;
pub const NOT_SYNCHRONIZED_CODE: i32 = -32003;
pub const UNAUTHORIZED_VOTER_CODE: i32 = -32004;
pub const ALREADY_EXISTS_CODE: i32 = -32005;
pub const UNSUPPORTED_VOTE_TYPE_CODE: i32 = -32006;
pub const CREDENTIALS_CODE: i32 = -32007;
pub const HUB_UNREACHABLE_CODE: i32 = -32008;
pub const EXECUTION_CODE: i32 = -32009;

/// The json rpc result response. It is the standard form our json-rpc and follows
/// JSON-RPC 2.0: https://www.jsonrpc.org/specification#response_object
#[derive(Debug, Serialize, Deserialize)]
pub struct JSONRPCResultResponse<T> {
    pub id: u16,
    pub jsonrpc: String,
    pub result: T,
}

impl<T: Serialize> JSONRPCResultResponse<T> {
    pub fn new(id: u16, result: T) -> Self {
        Self {
            id,
            jsonrpc: String::from(JSON_RPC_VERSION),
            result,
        }
    }
}

/// The json rpc error response error object. It follows JSON-RPC 2.0: https://www.jsonrpc.org/specification#error_object
#[derive(Debug, Serialize, Deserialize)]
pub struct JSONRPCError<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl JSONRPCError<()> {
    /// Maps a handler error to its error object. The message is the `Display` of the error.
    pub fn from_handler_error(e: &anyhow::Error) -> Self {
        let code = if let Some(e) = e.downcast_ref::<ApprovalError>() {
            approval_error_code(e)
        } else if e.downcast_ref::<MethodNotSupported>().is_some() {
            METHOD_NOT_FOUND_CODE
        } else if e.downcast_ref::<serde_json::Error>().is_some() {
            INVALID_PARAMS_CODE
        } else {
            INTERNAL_ERROR_CODE
        };

        Self {
            code,
            message: e.to_string(),
            data: None,
        }
    }
}

fn approval_error_code(e: &ApprovalError) -> i32 {
    match e {
        ApprovalError::NotFound(_) => NOT_FOUND_CODE,
        ApprovalError::IdentityMismatch { .. } => IDENTITY_MISMATCH_CODE,
        ApprovalError::NotSynchronized(_) => NOT_SYNCHRONIZED_CODE,
        ApprovalError::UnauthorizedVoter { .. } => UNAUTHORIZED_VOTER_CODE,
        ApprovalError::AlreadyExists(_) => ALREADY_EXISTS_CODE,
        ApprovalError::UnsupportedVoteType(_) => UNSUPPORTED_VOTE_TYPE_CODE,
        ApprovalError::InvalidPayload(_) => INVALID_PARAMS_CODE,
        ApprovalError::Credentials { .. } => CREDENTIALS_CODE,
        ApprovalError::HubUnreachable { .. } => HUB_UNREACHABLE_CODE,
        ApprovalError::Execution { .. } => EXECUTION_CODE,
        ApprovalError::Internal(_) => INTERNAL_ERROR_CODE,
    }
}

/// The json rpc error response. It is the standard form our json-rpc and follows JSON-RPC 2.0: https://www.jsonrpc.org/specification#response_object
#[derive(Debug, Serialize, Deserialize)]
pub struct JSONRPCErrorResponse<T> {
    pub id: u16,
    pub jsonrpc: String,
    pub error: JSONRPCError<T>,
}

impl JSONRPCErrorResponse<()> {
    pub fn invalid_request(id: u16) -> Self {
        Self {
            id,
            jsonrpc: String::from(JSON_RPC_VERSION),
            error: JSONRPCError {
                code: INVALID_REQUEST_CODE,
                message: String::from("Invalid Request"),
                data: None,
            },
        }
    }
}

impl<T: Serialize> JSONRPCErrorResponse<T> {
    pub fn new(id: u16, error: JSONRPCError<T>) -> Self {
        Self {
            id,
            jsonrpc: String::from(JSON_RPC_VERSION),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn error_codes() {
        let e = anyhow::Error::from(ApprovalError::NotSynchronized("v-1".to_string()));
        let error = JSONRPCError::from_handler_error(&e);
        assert_eq!(error.code, NOT_SYNCHRONIZED_CODE);
        assert_eq!(
            error.message,
            "vote v-1 is still synchronizing: the initiator signature has not arrived yet"
        );

        let e = anyhow::Error::from(MethodNotSupported("foo".to_string()));
        assert_eq!(
            JSONRPCError::from_handler_error(&e).code,
            METHOD_NOT_FOUND_CODE
        );

        let e = anyhow::Error::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(JSONRPCError::from_handler_error(&e).code, INVALID_PARAMS_CODE);

        let e = anyhow!("disk full");
        let error = JSONRPCError::from_handler_error(&e);
        assert_eq!(error.code, INTERNAL_ERROR_CODE);
        assert_eq!(error.message, "disk full");
    }
}
