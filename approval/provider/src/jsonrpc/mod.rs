// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;
use url::Url;

use crate::config::JSON_RPC_VERSION;

/// A convenience constant that represents empty params in a JSON-RPC request.
pub const NO_PARAMS: Value = json!([]);

/// A simple async JSON-RPC client that sends one-shot requests via HTTP/HTTPS. The returned
/// results are of type [`Value`] from the [`serde_json`] crate.
#[async_trait]
pub trait JsonRpcClient: Send + Sync {
    /// Sends a JSON-RPC request with `method` and `params` via HTTP/HTTPS and returns the `result`
    /// field of the response. A response carrying an `error` object is turned into an error.
    async fn request_value(&self, method: &str, params: Value) -> Result<Value>;

    async fn request<T: DeserializeOwned + Send>(&self, method: &str, params: Value) -> Result<T> {
        let value = self.request_value(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// The implementation of [`JsonRpcClient`].
pub struct JsonRpcClientImpl {
    http_client: Client,
    url: Url,
}

impl JsonRpcClientImpl {
    /// Creates a client that sends all requests to `url`, giving up after `timeout` when set.
    pub fn new(url: Url, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_default();
        Self { http_client, url }
    }
}

#[async_trait]
impl JsonRpcClient for JsonRpcClientImpl {
    async fn request_value(&self, method: &str, params: Value) -> Result<Value> {
        let request_body = build_jsonrpc_request(method, params)?;
        let response = self
            .http_client
            .post(self.url.as_str())
            .headers(HeaderMap::from_iter([(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )]))
            .body(request_body)
            .send()
            .await?;

        let status = response.status();
        let response_body = response.text().await?;
        log::trace!("received raw response body: {:?}", response_body);

        if !status.is_success() {
            return Err(anyhow!(
                "request {method} failed with status {status}: {response_body}"
            ));
        }

        let value: Value = serde_json::from_str(response_body.as_str())?;
        parse_response(value)
    }
}

// Extracts the result out of a JSON-RPC response, or turns its error object into an error.
fn parse_response(mut value: Value) -> Result<Value> {
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        return Err(anyhow!("json rpc error {code}: {message}"));
    }

    value
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| anyhow!("json rpc response has neither result nor error"))
}

// A convenience function to build and serialize a JSON-RPC request.
fn build_jsonrpc_request(method: &str, params: Value) -> Result<String> {
    let has_params = match &params {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => return Err(anyhow!("params is not an array nor an object")),
    };

    let request_value = if has_params {
        json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": 1,
            "method": method,
            "params": params,
        })
    } else {
        json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": 1,
            "method": method,
        })
    };
    Ok(request_value.to_string())
}
