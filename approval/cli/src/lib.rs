// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The approval daemon, serving the approval protocol over JSON-RPC, and the command line client
//! talking to it.

use async_trait::async_trait;
use clap::Args;
use std::fmt::Debug;

mod commands;
pub mod server;

pub use commands::cli;

pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:3030/json_rpc";

/// The trait that represents the abstraction of a command line handler. To implement a new command
/// line operation, implement this trait and register it in `commands::Commands`.
///
/// Note that this trait does not support a stateful implementation as we assume CLI commands are all
/// constructed from scratch.
#[async_trait]
pub trait CommandLineHandler {
    /// Abstraction for command line operations arguments.
    ///
    /// NOTE that this parameter is used to generate the command line arguments.
    /// Currently we are directly integrating with `clap` crate. In the future we can use our own
    /// implementation to abstract away external crates. But this should be good for now.
    type Arguments: Debug + Args;

    /// Handles the request with the provided arguments. Dev should handle the content to print and how
    /// to print the content, i.e. json, table or plain text.
    async fn handle(global: &GlobalArguments, arguments: &Self::Arguments) -> anyhow::Result<()>;
}

/// The global arguments that will be shared by all cli commands.
#[derive(Debug, Args, Clone)]
pub struct GlobalArguments {
    #[arg(
        long,
        global = true,
        env = "APPROVAL_URL",
        default_value = DEFAULT_DAEMON_URL,
        help = "The JSON RPC endpoint of the approval daemon"
    )]
    url: String,
}

impl GlobalArguments {
    pub fn url(&self) -> anyhow::Result<url::Url> {
        Ok(self.url.parse()?)
    }
}
