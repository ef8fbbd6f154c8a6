// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod config;
pub mod run;

use anyhow::Result;
use clap::Args;
use kex_core::{ClusterConfig, ResourceClass};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::KexError;

/// Options shared by commands that build a cluster configuration
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of peers
    #[arg(long)]
    pub peers: Option<u32>,

    /// Full cycles per peer (runs until Ctrl-C when absent)
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Capacity of pool A
    #[arg(long)]
    pub capacity_a: Option<u32>,

    /// Capacity of pool B
    #[arg(long)]
    pub capacity_b: Option<u32>,

    /// Lease on pool A slots, e.g. "500ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub lease_a: Option<Duration>,
}

impl ConfigOverrides {
    /// Load the file (or defaults), apply flags, and validate
    pub fn resolve(&self) -> Result<ClusterConfig> {
        let mut config = match &self.config {
            Some(path) => ClusterConfig::load(path)
                .map_err(|e| KexError::config_invalid(&path.display().to_string(), e))?,
            None => ClusterConfig::default(),
        };

        if let Some(peers) = self.peers {
            config.peers = peers;
        }
        if let Some(cycles) = self.cycles {
            config.cycles = Some(cycles);
        }
        if let Some(capacity) = self.capacity_a {
            config.pool_mut(ResourceClass::A).capacity = capacity;
        }
        if let Some(capacity) = self.capacity_b {
            config.pool_mut(ResourceClass::B).capacity = capacity;
        }
        if let Some(lease) = self.lease_a {
            config.pool_mut(ResourceClass::A).lease = Some(lease);
        }

        config
            .validate()
            .map_err(|e| KexError::config_invalid("command line", e))?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
