// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kex config` - Print the effective configuration

use anyhow::Result;
use clap::Args;

use super::ConfigOverrides;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

pub fn config(args: ConfigArgs) -> Result<()> {
    let config = args.overrides.resolve()?;
    print!("{}", config.to_toml()?);
    Ok(())
}
