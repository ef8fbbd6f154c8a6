// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Inbox, Transport, TransportError};
use async_trait::async_trait;
use kex_core::{Frame, Message, PeerId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Send { to: PeerId, frame: Frame },
    Broadcast { frame: Frame },
}

impl TransportCall {
    /// The classified message carried by this call, if it is well formed
    pub fn message(&self) -> Option<Message> {
        let frame = match self {
            TransportCall::Send { frame, .. } | TransportCall::Broadcast { frame } => *frame,
        };
        Message::try_from(frame).ok()
    }
}

/// Fake transport that records every call and can be told to fail
#[derive(Clone)]
pub struct FakeTransport {
    local: PeerId,
    peer_count: u32,
    calls: Arc<Mutex<Vec<TransportCall>>>,
    failure: Arc<Mutex<Option<TransportError>>>,
}

impl FakeTransport {
    pub fn new(local: PeerId, peer_count: u32) -> Self {
        Self {
            local,
            peer_count,
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages sent so far; `None` target means broadcast
    pub fn messages(&self) -> Vec<(Option<PeerId>, Message)> {
        self.calls()
            .into_iter()
            .filter_map(|call| {
                let to = match &call {
                    TransportCall::Send { to, .. } => Some(*to),
                    TransportCall::Broadcast { .. } => None,
                };
                call.message().map(|m| (to, m))
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        if let Some(error) = self
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        Ok(())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn local_id(&self) -> PeerId {
        self.local
    }

    fn peer_count(&self) -> u32 {
        self.peer_count
    }

    async fn send(&self, to: PeerId, frame: Frame) -> Result<(), TransportError> {
        if to.0 >= self.peer_count {
            return Err(TransportError::UnknownPeer(to));
        }
        self.record(TransportCall::Send { to, frame })
    }

    async fn broadcast(&self, frame: Frame) -> Result<(), TransportError> {
        self.record(TransportCall::Broadcast { frame })
    }
}

/// Inbox fed by a [`FakeInboxHandle`]
pub struct FakeInbox {
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// Test-side handle that injects frames into a [`FakeInbox`]
#[derive(Clone)]
pub struct FakeInboxHandle {
    tx: mpsc::UnboundedSender<Frame>,
}

impl FakeInbox {
    pub fn channel() -> (Self, FakeInboxHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, FakeInboxHandle { tx })
    }
}

impl FakeInboxHandle {
    /// Inject a raw frame, well formed or not
    pub fn push_frame(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }

    /// Inject a classified message
    pub fn push(&self, message: Message) {
        if let Ok(frame) = message.to_frame() {
            self.push_frame(frame);
        }
    }
}

#[async_trait]
impl Inbox for FakeInbox {
    fn try_recv(&mut self) -> Result<Option<Frame>, TransportError> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
