// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced transport wrappers for consistent observability

use crate::transport::{Inbox, Transport, TransportError};
use async_trait::async_trait;
use kex_core::{Frame, PeerId};
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any Transport
#[derive(Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for TracedTransport<T> {
    fn local_id(&self) -> PeerId {
        self.inner.local_id()
    }

    fn peer_count(&self) -> u32 {
        self.inner.peer_count()
    }

    async fn send(&self, to: PeerId, frame: Frame) -> Result<(), TransportError> {
        let span = tracing::debug_span!(
            "transport.send",
            from = %self.inner.local_id(),
            to = %to,
            tag = frame.tag
        );

        async {
            let result = self.inner.send(to, frame).await;
            match &result {
                Ok(()) => tracing::trace!(clock = frame.body.sender_clock, "sent"),
                Err(e) => tracing::error!(error = %e, "send failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError> {
        let span = tracing::debug_span!(
            "transport.broadcast",
            from = %self.inner.local_id(),
            tag = frame.tag
        );

        async {
            let result = self.inner.broadcast(frame).await;
            match &result {
                Ok(()) => tracing::trace!(
                    clock = frame.body.sender_clock,
                    peers = self.inner.peer_count(),
                    "broadcast"
                ),
                Err(e) => tracing::error!(error = %e, "broadcast failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any Inbox
pub struct TracedInbox<I> {
    local: PeerId,
    inner: I,
}

impl<I> TracedInbox<I> {
    pub fn new(local: PeerId, inner: I) -> Self {
        Self { local, inner }
    }
}

#[async_trait]
impl<I: Inbox> Inbox for TracedInbox<I> {
    fn try_recv(&mut self) -> Result<Option<Frame>, TransportError> {
        let result = self.inner.try_recv();
        trace_received(self.local, &result);
        result
    }

    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        let result = self.inner.recv_timeout(timeout).await;
        trace_received(self.local, &result);
        result
    }
}

fn trace_received(local: PeerId, result: &Result<Option<Frame>, TransportError>) {
    match result {
        Ok(Some(frame)) => tracing::trace!(
            peer = %local,
            tag = frame.tag,
            sender = frame.body.sender_id,
            clock = frame.body.sender_clock,
            "received"
        ),
        Ok(None) => {}
        Err(e) => tracing::error!(peer = %local, error = %e, "receive failed"),
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
