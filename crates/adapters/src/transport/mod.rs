// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport between peers
//!
//! The coordination engine needs reliable delivery, FIFO order per
//! (sender, receiver) pair, broadcast to every peer including the sender,
//! point-to-point unicast, and a non-blocking "message available" probe.

mod local;

pub use local::{LocalInbox, LocalNetwork, LocalTransport};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInbox, FakeInboxHandle, FakeTransport, TransportCall};

use async_trait::async_trait;
use kex_core::{Frame, FrameError, PeerId};
use std::time::Duration;
use thiserror::Error;

/// Errors from transport operations. All of them are fatal to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),
    #[error("peer disconnected: {0}")]
    Disconnected(PeerId),
    #[error("transport closed")]
    Closed,
    #[error("malformed frame: {0}")]
    Malformed(#[from] FrameError),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Sending half of a peer's connection to the group
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    /// Rank of the peer this transport sends from
    fn local_id(&self) -> PeerId;

    /// Number of peers in the group (N)
    fn peer_count(&self) -> u32;

    /// Deliver a frame to one peer
    async fn send(&self, to: PeerId, frame: Frame) -> Result<(), TransportError>;

    /// Deliver a frame to every peer, including the sender
    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError>;
}

/// Receiving half of a peer's connection, owned by the receiver loop
#[async_trait]
pub trait Inbox: Send + 'static {
    /// Non-blocking probe: a frame if one is available right now
    fn try_recv(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Wait up to `timeout` for the next frame
    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError>;
}
