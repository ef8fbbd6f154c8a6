// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp-ordered sending for one peer
//!
//! Every outgoing message is stamped and sent while holding the outbox
//! gate, so a peer's messages leave in the order of their timestamps. An
//! ACK from peer j then implies every request j stamped earlier is already
//! queued at the receiver. The gate is an async mutex; the clock lock is
//! released before the send starts.

use kex_adapters::{Transport, TransportError};
use kex_core::{LamportClock, LamportTime, Message, MessageKind, PeerId, ResourceClass};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Outbox<T> {
    clock: Arc<LamportClock>,
    transport: T,
    gate: Mutex<()>,
}

impl<T: Transport> Outbox<T> {
    pub fn new(clock: Arc<LamportClock>, transport: T) -> Self {
        Self {
            clock,
            transport,
            gate: Mutex::new(()),
        }
    }

    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn local_id(&self) -> PeerId {
        self.transport.local_id()
    }

    pub fn peer_count(&self) -> u32 {
        self.transport.peer_count()
    }

    /// Stamp a message and deliver it to every peer, including this one
    pub async fn broadcast(
        &self,
        kind: MessageKind,
        class: ResourceClass,
    ) -> Result<LamportTime, TransportError> {
        let _gate = self.gate.lock().await;
        let ts = self.clock.increment();
        let frame = Message::new(kind, self.local_id(), ts, class).to_frame()?;
        self.transport.broadcast(frame).await?;
        tracing::debug!(peer = %self.local_id(), %kind, %class, ts, "broadcast");
        Ok(ts)
    }

    /// Stamp a message and deliver it to one peer
    pub async fn send(
        &self,
        to: PeerId,
        kind: MessageKind,
        class: ResourceClass,
    ) -> Result<LamportTime, TransportError> {
        let _gate = self.gate.lock().await;
        let ts = self.clock.increment();
        let frame = Message::new(kind, self.local_id(), ts, class).to_frame()?;
        self.transport.send(to, frame).await?;
        tracing::debug!(peer = %self.local_id(), %to, %kind, %class, ts, "sent");
        Ok(ts)
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
