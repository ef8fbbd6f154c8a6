// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kex run` - Run an in-process cluster until the cycle limit or Ctrl-C

use anyhow::{Context, Result};
use clap::Args;
use kex_engine::{Cluster, StopSignal};
use std::path::PathBuf;

use super::ConfigOverrides;
use crate::error::KexError;
use crate::logging::setup_logging;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let _log_guard = setup_logging(args.log_file.as_deref())?;
    let config = args.overrides.resolve()?;

    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            if stop.trigger() {
                tracing::warn!("interrupted, finishing current cycles");
            }
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let cluster = Cluster::start(&config, stop).map_err(KexError::cluster_failed)?;
    let report = cluster.wait().await.map_err(KexError::cluster_failed)?;

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    output::print_report(&report, format)?;

    if !report.is_safe() {
        return Err(KexError::exclusion_violated(&report.violations).into());
    }
    Ok(())
}
