// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Propose vote cli command

use std::fmt::Debug;

use approval_provider::config::json_rpc_methods;
use approval_provider::jsonrpc::JsonRpcClient;
use approval_sdk::VoteType;
use async_trait::async_trait;
use clap::Args;
use serde_json::Value;

use crate::commands::{get_daemon_client, print_json};
use crate::server::handlers::ProposeParams;
use crate::{CommandLineHandler, GlobalArguments};

/// The command to propose an action to the other participants.
pub(crate) struct Propose;

#[async_trait]
impl CommandLineHandler for Propose {
    type Arguments = ProposeArgs;

    async fn handle(global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("propose vote with args: {:?}", arguments);

        let params = ProposeParams {
            participant: arguments.participant.clone(),
            vote_type: arguments.vote_type,
            config: serde_json::from_str(&arguments.config)?,
        };

        let client = get_daemon_client(global)?;
        let response = client
            .request::<Value>(json_rpc_methods::PROPOSE, serde_json::to_value(params)?)
            .await?;

        log::info!("proposed vote: {}", response["voteId"]);
        print_json(&response)
    }
}

#[derive(Debug, Args)]
#[command(about = "Propose an action that takes effect once every voter approved it")]
pub(crate) struct ProposeArgs {
    #[arg(long, short, help = "The proposing participant")]
    pub participant: String,
    #[arg(
        long,
        short,
        help = "The category of the vote: NODE_ROUTE, TEE_DOWNLOAD or PROJECT_CREATE"
    )]
    pub vote_type: VoteType,
    #[arg(long, short, help = "The JSON configuration of the proposed action")]
    pub config: String,
}
