// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! List votes and vote detail cli commands

use std::fmt::Debug;

use approval_provider::config::json_rpc_methods;
use approval_provider::jsonrpc::JsonRpcClient;
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;

use crate::commands::{get_daemon_client, print_json};
use crate::server::handlers::{ListVotesParams, VoteDetailParams};
use crate::{CommandLineHandler, GlobalArguments};

pub(crate) struct ListVotes;

#[async_trait]
impl CommandLineHandler for ListVotes {
    type Arguments = ListVotesArgs;

    async fn handle(global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("list votes with args: {:?}", arguments);

        let params = ListVotesParams {
            participant: arguments.participant.clone(),
        };
        let client = get_daemon_client(global)?;
        let votes = client
            .request::<Vec<Value>>(json_rpc_methods::LIST_VOTES, serde_json::to_value(params)?)
            .await?;

        for vote in votes.iter() {
            log::info!(
                "{} {} {}: {}",
                vote["voteId"],
                vote["type"],
                vote["status"],
                vote["title"]
            );
        }
        print_json(&votes)
    }
}

#[derive(Debug, Args)]
#[command(about = "List the votes a participant initiated or votes on, newest first")]
pub(crate) struct ListVotesArgs {
    #[arg(long, short, help = "The participant to list the votes of")]
    pub participant: String,
}

pub(crate) struct VoteDetail;

#[async_trait]
impl CommandLineHandler for VoteDetail {
    type Arguments = VoteDetailArgs;

    async fn handle(global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("vote detail with args: {:?}", arguments);

        let params = VoteDetailParams {
            participant: arguments.participant.clone(),
            vote_id: arguments.vote_id.clone(),
        };
        let client = get_daemon_client(global)?;
        let detail = client
            .request::<Value>(json_rpc_methods::VOTE_DETAIL, serde_json::to_value(params)?)
            .await?;

        print_json(&detail)
    }
}

#[derive(Debug, Args)]
#[command(about = "Show a vote with the reply of every voter")]
pub(crate) struct VoteDetailArgs {
    #[arg(long, short, help = "The participant reading the vote")]
    pub participant: String,
    #[arg(long, short, help = "The vote to show")]
    pub vote_id: String,
}
