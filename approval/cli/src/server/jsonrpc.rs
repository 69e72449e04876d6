// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The json rpc server exposing the approval protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use approval_provider::config::{JSON_RPC_ENDPOINT, JSON_RPC_VERSION};
use bytes::Bytes;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::reply::with_status;
use warp::{Filter, Rejection, Reply};

use crate::server::handlers::Handlers;
use crate::server::request::JSONRPCRequest;
use crate::server::response::{JSONRPCError, JSONRPCErrorResponse, JSONRPCResultResponse};

/// The approval JSON RPC node that contains all the methods and handlers. The underlying
/// implementation is using `warp`.
///
/// Note that currently only http json rpc is supported.
pub struct JsonRPCServer {
    addr: SocketAddr,
    handlers: Arc<Handlers>,
}

impl JsonRPCServer {
    pub fn new(addr: SocketAddr, handlers: Handlers) -> Self {
        Self {
            addr,
            handlers: Arc::new(handlers),
        }
    }

    /// Runs the node in the current thread
    pub async fn run(&self) {
        log::info!("approval json rpc node listening at {:?}", self.addr);
        warp::serve(json_rpc_filter(self.handlers.clone()))
            .run(self.addr)
            .await;
    }
}

// Internal implementations

/// Create the json_rpc filter. The filter does the following:
/// - Listen to POST requests on the JSON_RPC_ENDPOINT
/// - Extract the body of the request.
/// - Pass it to to the process function.
fn json_rpc_filter(
    handlers: Arc<Handlers>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path(JSON_RPC_ENDPOINT))
        .and(warp::body::bytes())
        .and_then(to_json_rpc_request)
        .and(with_handlers(handlers))
        .and_then(handle_request)
        .recover(handle_rejection)
}

fn with_handlers(
    handlers: Arc<Handlers>,
) -> impl Filter<Extract = (Arc<Handlers>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || handlers.clone())
}

async fn to_json_rpc_request(bytes: Bytes) -> Result<JSONRPCRequest, warp::Rejection> {
    serde_json::from_slice::<JSONRPCRequest>(bytes.as_ref()).map_err(|e| {
        log::debug!("cannot deserialize {bytes:?} due to {e:?}");
        warp::reject::custom(InvalidParameter)
    })
}

/// Dispatches the json rpc request to the handler registered for its method.
async fn handle_request(
    json_rpc_request: JSONRPCRequest,
    handlers: Arc<Handlers>,
) -> Result<impl Reply, warp::Rejection> {
    log::debug!("received json rpc request = {:?}", json_rpc_request);

    let JSONRPCRequest {
        id,
        method,
        params,
        jsonrpc,
    } = json_rpc_request;

    if jsonrpc != JSON_RPC_VERSION {
        return Ok(warp::reply::json(&JSONRPCErrorResponse::invalid_request(id)));
    }

    match handlers.handle(method.clone(), params).await {
        Ok(result) => Ok(warp::reply::json(&JSONRPCResultResponse::new(id, result))),
        Err(e) => {
            log::error!("cannot process json rpc method {method} due to {e:#}");
            Ok(warp::reply::json(&JSONRPCErrorResponse::new(
                id,
                JSONRPCError::from_handler_error(&e),
            )))
        }
    }
}

/// The invalid parameter warp rejection error handling
#[derive(Debug)]
struct InvalidParameter;

impl Reject for InvalidParameter {}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, warp::Rejection> {
    if err.is_not_found() {
        Ok(with_status("NOT_FOUND", StatusCode::NOT_FOUND))
    } else if err.find::<InvalidParameter>().is_some() {
        Ok(with_status("BAD_REQUEST", StatusCode::BAD_REQUEST))
    } else {
        log::error!("unhandled rejection: {:?}", err);
        Ok(with_status(
            "INTERNAL_SERVER_ERROR",
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}
