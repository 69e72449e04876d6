// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The approval daemon json rpc server.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod handlers;
pub mod jsonrpc;
pub mod request;
pub mod response;

/// The trait to handle one json rpc method. `Request` is decoded from the `params` field of the
/// request and `Response` is encoded into the `result` field of the response.
#[async_trait]
pub trait JsonRPCRequestHandler {
    type Request: DeserializeOwned + Send;
    type Response: Serialize;

    async fn handle(&self, request: Self::Request) -> anyhow::Result<Self::Response>;
}
