// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster configuration: peer count, pool capacities, hold and lease times
//!
//! Loaded from TOML. Durations use humantime syntax (`"250ms"`, `"2s"`).

use crate::message::ResourceClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("peers must be at least 1")]
    NoPeers,
    #[error("pool {0} capacity must be at least 1")]
    ZeroCapacity(ResourceClass),
    #[error("poll_interval must be greater than zero")]
    ZeroPollInterval,
    #[error("pool {0} lease must be greater than zero")]
    ZeroLease(ResourceClass),
    #[error("pool {0} sets early_release without a lease")]
    EarlyReleaseWithoutLease(ResourceClass),
}

/// How a held slot is given back
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// The business logic sends RELEASE itself
    Explicit,
    /// A lease armed at admission sends RELEASE when it expires
    Leased {
        timeout: Duration,
        /// Expire the lease this long after the work is done, if sooner
        early_release: Option<Duration>,
    },
}

/// Settings for one resource pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum concurrent holders (k)
    pub capacity: u32,
    /// Simulated use of the resource once admitted
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    /// Upper bound on holding a slot; absent means explicit release
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub lease: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub early_release: Option<Duration>,
}

impl PoolConfig {
    pub fn new(capacity: u32, hold: Duration) -> Self {
        Self {
            capacity,
            hold,
            lease: None,
            early_release: None,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn with_early_release(mut self, delay: Duration) -> Self {
        self.early_release = Some(delay);
        self
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        match self.lease {
            Some(timeout) => ReleasePolicy::Leased {
                timeout,
                early_release: self.early_release,
            },
            None => ReleasePolicy::Explicit,
        }
    }

    fn default_a() -> Self {
        Self::new(2, Duration::from_millis(100)).with_lease(Duration::from_secs(1))
    }

    fn default_b() -> Self {
        Self::new(1, Duration::from_millis(50))
    }

    fn validate(&self, class: ResourceClass) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity(class));
        }
        if self.lease.is_some_and(|lease| lease.is_zero()) {
            return Err(ConfigError::ZeroLease(class));
        }
        if self.early_release.is_some() && self.lease.is_none() {
            return Err(ConfigError::EarlyReleaseWithoutLease(class));
        }
        Ok(())
    }
}

/// Configuration shared by every peer of a cluster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Number of peers (N)
    #[serde(default = "default_peers")]
    pub peers: u32,
    /// Bounded wait used as a fallback against missed wakeups
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Full cycles each peer runs before stopping; absent runs until stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<u32>,
    #[serde(default = "PoolConfig::default_a")]
    pub pool_a: PoolConfig,
    #[serde(default = "PoolConfig::default_b")]
    pub pool_b: PoolConfig,
}

fn default_peers() -> u32 {
    3
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(20)
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
            poll_interval: default_poll_interval(),
            cycles: None,
            pool_a: PoolConfig::default_a(),
            pool_b: PoolConfig::default_b(),
        }
    }
}

impl ClusterConfig {
    pub fn new(peers: u32) -> Self {
        Self {
            peers,
            ..Self::default()
        }
    }

    /// Read and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), peers = config.peers, "loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ClusterConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peers == 0 {
            return Err(ConfigError::NoPeers);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.pool_a.validate(ResourceClass::A)?;
        self.pool_b.validate(ResourceClass::B)?;
        Ok(())
    }

    pub fn pool(&self, class: ResourceClass) -> &PoolConfig {
        match class {
            ResourceClass::A => &self.pool_a,
            ResourceClass::B => &self.pool_b,
        }
    }

    pub fn pool_mut(&mut self, class: ResourceClass) -> &mut PoolConfig {
        match class {
            ResourceClass::A => &mut self.pool_a,
            ResourceClass::B => &mut self.pool_b,
        }
    }

    pub fn with_cycles(mut self, cycles: u32) -> Self {
        self.cycles = Some(cycles);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_pool(mut self, class: ResourceClass, pool: PoolConfig) -> Self {
        *self.pool_mut(class) = pool;
        self
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
