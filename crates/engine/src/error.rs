// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordination engine

use kex_adapters::TransportError;
use kex_core::{ConfigError, PeerId};
use thiserror::Error;
use tokio::task::JoinError;

/// Errors that end a single peer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("lease worker for {0} exited without an outcome")]
    LeaseLost(PeerId),
    #[error("lease manager for {0} is shut down")]
    LeaseClosed(PeerId),
}

/// Errors reported to whoever started the cluster
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{peer} failed: {source}")]
    PeerFailed {
        peer: PeerId,
        #[source]
        source: EngineError,
    },
    #[error("{task} task of {peer} panicked")]
    TaskPanicked { peer: PeerId, task: &'static str },
    #[error("occupancy monitor failed: {0}")]
    MonitorFailed(#[source] JoinError),
}
