// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Receiver loop: drains the inbox and feeds the pool controllers

use crate::error::EngineError;
use crate::outbox::Outbox;
use crate::pool::PoolController;
use crate::stop::StopSignal;
use kex_adapters::{Inbox, Transport, TransportError};
use kex_core::{Frame, Message, MessageKind, PeerId, PendingRequest, ResourceClass};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Counters kept by one router
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub received: u64,
    pub dropped: u64,
    pub acks_sent: u64,
}

pub struct MessageRouter<T, I> {
    inbox: I,
    outbox: Arc<Outbox<T>>,
    pools: [Arc<PoolController<T>>; 2],
    poll_interval: Duration,
    stop: StopSignal,
    stats: RouterStats,
}

impl<T: Transport, I: Inbox> MessageRouter<T, I> {
    /// `pools` is indexed by [`ResourceClass::index`]
    pub fn new(
        inbox: I,
        outbox: Arc<Outbox<T>>,
        pools: [Arc<PoolController<T>>; 2],
        poll_interval: Duration,
        stop: StopSignal,
    ) -> Self {
        Self {
            inbox,
            outbox,
            pools,
            poll_interval,
            stop,
            stats: RouterStats::default(),
        }
    }

    fn local(&self) -> PeerId {
        self.outbox.local_id()
    }

    /// Run until the stop signal is raised or the transport fails.
    ///
    /// A transport failure raises the stop signal for everyone sharing it.
    pub async fn run(mut self) -> Result<RouterStats, EngineError> {
        tracing::debug!(peer = %self.local(), "router started");
        while !self.stop.is_stopped() {
            let frame = match self.inbox.recv_timeout(self.poll_interval).await {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            };
            if let Err(e) = self.handle(frame).await {
                return self.fail(e);
            }
        }
        tracing::debug!(peer = %self.local(), received = self.stats.received, "router stopped");
        Ok(self.stats)
    }

    fn fail(&self, error: TransportError) -> Result<RouterStats, EngineError> {
        if self.stop.is_stopped() {
            tracing::warn!(peer = %self.local(), error = %error, "router stopping after transport error");
            return Ok(self.stats);
        }
        tracing::error!(peer = %self.local(), error = %error, "router failed");
        self.stop.trigger();
        Err(EngineError::Transport(error))
    }

    /// Process one frame. Malformed frames are dropped.
    pub async fn handle(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.stats.received += 1;
        let message = match Message::try_from(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(peer = %self.local(), error = %e, tag = frame.tag, "dropping malformed frame");
                self.stats.dropped += 1;
                return Ok(());
            }
        };
        if message.sender.0 >= self.outbox.peer_count() {
            tracing::warn!(peer = %self.local(), sender = %message.sender, "dropping frame from unknown peer");
            self.stats.dropped += 1;
            return Ok(());
        }

        self.outbox.clock().observe(message.clock);
        tracing::debug!(
            peer = %self.local(),
            kind = %message.kind,
            class = %message.class,
            sender = %message.sender,
            ts = message.clock,
            "received"
        );

        let pool = self.pool(message.class);
        match message.kind {
            MessageKind::Request => {
                let request = PendingRequest::new(message.sender, message.clock, message.class);
                if pool.on_request(request) == kex_core::InsertOutcome::Inserted {
                    self.outbox
                        .send(message.sender, MessageKind::Ack, message.class)
                        .await?;
                    self.stats.acks_sent += 1;
                }
            }
            MessageKind::Ack => pool.on_ack(message.sender),
            MessageKind::Release => {
                pool.on_release(message.sender);
            }
        }
        Ok(())
    }

    fn pool(&self, class: ResourceClass) -> Arc<PoolController<T>> {
        Arc::clone(&self.pools[class.index()])
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
