// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process transport for a group of peers sharing one runtime
//!
//! Every peer owns one unbounded channel. Frames travel encoded, so the
//! fixed wire layout is exercised exactly as a network transport would.
//! A single channel per receiver keeps delivery FIFO per sender.

use super::{Inbox, Transport, TransportError};
use async_trait::async_trait;
use kex_core::{Frame, PeerId, FRAME_LEN};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

type Encoded = [u8; FRAME_LEN];

/// Builder for a fully connected in-process group
pub struct LocalNetwork;

impl LocalNetwork {
    /// Create the transport and inbox for each of `peer_count` peers,
    /// indexed by rank
    pub fn build(peer_count: u32) -> Vec<(LocalTransport, LocalInbox)> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..peer_count).map(|_| mpsc::unbounded_channel()).unzip();
        let senders = Arc::new(senders);

        PeerId::all(peer_count)
            .zip(receivers)
            .map(|(local, rx)| {
                (
                    LocalTransport {
                        local,
                        peers: Arc::clone(&senders),
                    },
                    LocalInbox { local, rx },
                )
            })
            .collect()
    }
}

/// Sending half of an in-process peer
#[derive(Clone)]
pub struct LocalTransport {
    local: PeerId,
    peers: Arc<Vec<mpsc::UnboundedSender<Encoded>>>,
}

impl LocalTransport {
    fn deliver(&self, to: PeerId, bytes: Encoded) -> Result<(), TransportError> {
        let peer = self
            .peers
            .get(to.index())
            .ok_or(TransportError::UnknownPeer(to))?;
        peer.send(bytes)
            .map_err(|_| TransportError::Disconnected(to))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn local_id(&self) -> PeerId {
        self.local
    }

    fn peer_count(&self) -> u32 {
        self.peers.len() as u32
    }

    async fn send(&self, to: PeerId, frame: Frame) -> Result<(), TransportError> {
        self.deliver(to, frame.encode())
    }

    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError> {
        let bytes = frame.encode();
        for to in PeerId::all(self.peer_count()) {
            self.deliver(to, bytes)?;
        }
        Ok(())
    }
}

/// Receiving half of an in-process peer
pub struct LocalInbox {
    local: PeerId,
    rx: mpsc::UnboundedReceiver<Encoded>,
}

impl LocalInbox {
    pub fn local_id(&self) -> PeerId {
        self.local
    }
}

#[async_trait]
impl Inbox for LocalInbox {
    fn try_recv(&mut self) -> Result<Option<Frame>, TransportError> {
        match self.rx.try_recv() {
            Ok(bytes) => Ok(Some(Frame::decode(&bytes)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(bytes)) => Ok(Some(Frame::decode(&bytes)?)),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
