// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! The module that contains all the CLI commands.

mod daemon;
mod keygen;
mod list;
mod propose;
mod reply;

use std::fmt::Debug;
use std::time::Duration;

use approval_provider::jsonrpc::JsonRpcClientImpl;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::commands::daemon::{LaunchDaemon, LaunchDaemonArgs};
use crate::commands::keygen::{KeyGen, KeyGenArgs};
use crate::commands::list::{ListVotes, ListVotesArgs, VoteDetail, VoteDetailArgs};
use crate::commands::propose::{Propose, ProposeArgs};
use crate::commands::reply::{Reply, ReplyArgs};
use crate::{CommandLineHandler, GlobalArguments};

/// Client requests to the daemon give up after this long.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// The collection of all subcommands to be called, see clap's documentation for usage. Internal
/// to the current mode. Register a new command accordingly.
#[derive(Debug, Subcommand)]
enum Commands {
    Daemon(LaunchDaemonArgs),
    Propose(ProposeArgs),
    Reply(ReplyArgs),
    List(ListVotesArgs),
    Detail(VoteDetailArgs),
    Keygen(KeyGenArgs),
}

/// The overall command line struct to be used by `clap`.
#[derive(Debug, Parser)]
#[command(
    name = "approval",
    about = "The multi-party approval daemon and command line client",
    version = "v0.1.0"
)]
#[command(propagate_version = true)]
struct ApprovalCliCommands {
    #[command(flatten)]
    global_params: GlobalArguments,
    #[command(subcommand)]
    command: Commands,
}

/// The `cli` method exposed to handle all the cli commands, ideally from main.
///
/// # Examples
/// To register a new command, add the command to
/// ```ignore
/// pub async fn cli() -> anyhow::Result<()> {
///
///     // ... other code
///
///     let r = match &args.command {
///         // ... other existing commands
///         Commands::NewCommand(n) => NewCommand::handle(global, n).await,
///     };
///
///     // ... other code
/// ```
/// Also add this type to Command enum.
/// ```ignore
/// enum Commands {
///     NewCommand(NewCommandArgs),
/// }
/// ```
pub async fn cli() -> anyhow::Result<()> {
    // parse the arguments
    let args = ApprovalCliCommands::parse();
    let global = &args.global_params;

    let r = match &args.command {
        Commands::Daemon(args) => LaunchDaemon::handle(global, args).await,
        Commands::Propose(args) => Propose::handle(global, args).await,
        Commands::Reply(args) => Reply::handle(global, args).await,
        Commands::List(args) => ListVotes::handle(global, args).await,
        Commands::Detail(args) => VoteDetail::handle(global, args).await,
        Commands::Keygen(args) => KeyGen::handle(global, args).await,
    };

    r.map_err(|e| {
        log::error!(
            "process command: {:?} failed due to error: {:?}",
            args.command,
            e
        );
        e
    })
}

/// The client of the daemon targeted by the global `--url`.
pub(crate) fn get_daemon_client(global: &GlobalArguments) -> anyhow::Result<JsonRpcClientImpl> {
    Ok(JsonRpcClientImpl::new(global.url()?, Some(CLIENT_TIMEOUT)))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
