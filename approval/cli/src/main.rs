// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

#[tokio::main]
async fn main() {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if let Err(e) = approval_cli::cli().await {
        log::error!("main process failed: {e:#}");
        std::process::exit(1);
    }
}
