// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The module contains the handlers implementation for the json rpc server.

mod list;
mod propose;
mod reply;
mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use approval_provider::config::json_rpc_methods;
use approval_provider::ApprovalProvider;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::server::handlers::list::{ListVotesHandler, VoteDetailHandler};
use crate::server::handlers::propose::ProposeHandler;
use crate::server::handlers::reply::ReplyHandler;
use crate::server::handlers::sync::SyncHandler;
use crate::server::JsonRPCRequestHandler;

pub use list::{ListVotesParams, VoteDetailParams};
pub use propose::{ProposeParams, ProposeResponse};
pub use reply::ReplyParams;

pub type Method = String;

#[derive(Debug, Error)]
#[error("method {0} not supported")]
pub struct MethodNotSupported(pub Method);

/// The collection of all json rpc handlers
pub struct Handlers {
    handlers: HashMap<Method, Box<dyn HandlerWrapper>>,
}

/// A util trait to avoid Box<dyn> and associated type mess in Handlers struct
#[async_trait]
trait HandlerWrapper: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value>;
}

#[async_trait]
impl<H: JsonRPCRequestHandler + Send + Sync> HandlerWrapper for H {
    async fn handle(&self, params: Value) -> Result<Value> {
        let p = serde_json::from_value(params)?;
        let r = JsonRPCRequestHandler::handle(self, p).await?;
        Ok(serde_json::to_value(r)?)
    }
}

impl Handlers {
    /// We test the handlers separately and individually instead of from the handlers.
    /// Convenient method for json rpc to test routing.
    #[cfg(test)]
    pub fn empty_handlers() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn new(provider: Arc<ApprovalProvider>) -> Self {
        let mut handlers = HashMap::new();

        let h: Box<dyn HandlerWrapper> = Box::new(ProposeHandler::new(provider.clone()));
        handlers.insert(String::from(json_rpc_methods::PROPOSE), h);

        let h: Box<dyn HandlerWrapper> = Box::new(ReplyHandler::new(provider.clone()));
        handlers.insert(String::from(json_rpc_methods::REPLY), h);

        let h: Box<dyn HandlerWrapper> = Box::new(ListVotesHandler::new(provider.clone()));
        handlers.insert(String::from(json_rpc_methods::LIST_VOTES), h);

        let h: Box<dyn HandlerWrapper> = Box::new(VoteDetailHandler::new(provider.clone()));
        handlers.insert(String::from(json_rpc_methods::VOTE_DETAIL), h);

        // the ingress of records pushed by other participants
        let h: Box<dyn HandlerWrapper> = Box::new(SyncHandler::new(provider));
        handlers.insert(String::from(json_rpc_methods::SYNC), h);

        Self { handlers }
    }

    pub async fn handle(&self, method: Method, params: Value) -> Result<Value> {
        if let Some(wrapper) = self.handlers.get(&method) {
            wrapper.handle(params).await
        } else {
            Err(MethodNotSupported(method).into())
        }
    }
}
