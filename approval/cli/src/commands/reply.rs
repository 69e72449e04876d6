// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Reply to vote cli command

use std::fmt::Debug;

use approval_provider::config::json_rpc_methods;
use approval_provider::jsonrpc::JsonRpcClient;
use approval_sdk::VoteAction;
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;

use crate::commands::{get_daemon_client, print_json};
use crate::server::handlers::ReplyParams;
use crate::{CommandLineHandler, GlobalArguments};

pub(crate) struct Reply;

#[async_trait]
impl CommandLineHandler for Reply {
    type Arguments = ReplyArgs;

    async fn handle(global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("reply to vote with args: {:?}", arguments);

        let params = ReplyParams {
            participant: arguments.participant.clone(),
            vote_id: arguments.vote_id.clone(),
            action: arguments.action,
            reason: arguments.reason.clone(),
        };

        let client = get_daemon_client(global)?;
        let outcome = client
            .request::<Value>(json_rpc_methods::REPLY, serde_json::to_value(params)?)
            .await?;

        log::info!(
            "replied {} to vote {}, vote is {}",
            arguments.action,
            arguments.vote_id,
            outcome["status"]
        );
        print_json(&outcome)
    }
}

#[derive(Debug, Args)]
#[command(about = "Approve or reject a vote")]
pub(crate) struct ReplyArgs {
    #[arg(long, short, help = "The replying participant")]
    pub participant: String,
    #[arg(long, short, help = "The vote to reply to")]
    pub vote_id: String,
    #[arg(long, short, help = "APPROVED or REJECTED")]
    pub action: VoteAction,
    #[arg(long, short, help = "An optional reason for the reply")]
    pub reason: Option<String>,
}
