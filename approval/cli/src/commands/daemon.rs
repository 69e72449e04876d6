// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The daemon cli handler, serving the approval protocol of one process.

use std::fmt::Debug;
use std::sync::Arc;

use approval_provider::config::Config;
use approval_provider::ApprovalProvider;
use async_trait::async_trait;
use clap::Args;

use crate::server::handlers::Handlers;
use crate::server::jsonrpc::JsonRPCServer;
use crate::{CommandLineHandler, GlobalArguments};

/// The command to start the approval daemon.
pub(crate) struct LaunchDaemon;

#[async_trait]
impl CommandLineHandler for LaunchDaemon {
    type Arguments = LaunchDaemonArgs;

    async fn handle(_global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()> {
        log::debug!("launching daemon with args: {:?}", arguments);

        let config = Config::from_file_async(&arguments.config).await?;
        let provider = Arc::new(ApprovalProvider::from_config(&config)?);

        let server =
            JsonRPCServer::new(config.server.json_rpc_address, Handlers::new(provider));
        server.run().await;

        Ok(())
    }
}

#[derive(Debug, Args)]
#[command(about = "Launch the approval daemon")]
pub(crate) struct LaunchDaemonArgs {
    #[arg(long, short, env = "APPROVAL_CONFIG", help = "The toml config file path")]
    pub config: String,
}
