// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kex - distributed k-exclusion simulator

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod error;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use commands::{config, run};
use std::process::ExitCode;

use crate::error::KexError;

#[derive(Parser)]
#[command(
    name = "kex",
    version,
    about = "Distributed k-exclusion over two dependent resource pools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-process cluster and print what it observed
    Run(run::RunArgs),
    /// Print the effective configuration as TOML
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Config(args) => config::config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<KexError>() {
                Some(kex) => eprint!("{kex}"),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
