// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control for one resource pool
//!
//! Each peer keeps its own replica of every pool's request queue. Replicas
//! converge because they are sorted by `(timestamp, requester)`, a key
//! carried in every REQUEST. A peer is admitted once all N peers have
//! acknowledged its request and its entry ranks among the first `capacity`
//! active entries.

use crate::outbox::Outbox;
use crate::stop::StopSignal;
use kex_adapters::{Transport, TransportError};
use kex_core::{
    InsertOutcome, LamportTime, MessageKind, PeerId, PendingRequest, RequestQueue, ResourceClass,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Result of waiting for a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Stopped,
}

/// Read-only copy of a pool's state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub class: ResourceClass,
    pub capacity: u32,
    pub ack_count: u32,
    pub queue: Vec<PendingRequest>,
}

#[derive(Default)]
struct PoolState {
    queue: RequestQueue,
    ack_count: u32,
}

pub struct PoolController<T> {
    class: ResourceClass,
    capacity: u32,
    outbox: Arc<Outbox<T>>,
    state: Mutex<PoolState>,
    admitted: Notify,
}

impl<T: Transport> PoolController<T> {
    pub fn new(class: ResourceClass, capacity: u32, outbox: Arc<Outbox<T>>) -> Self {
        Self {
            class,
            capacity,
            outbox,
            state: Mutex::new(PoolState::default()),
            admitted: Notify::new(),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn local_id(&self) -> PeerId {
        self.outbox.local_id()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admissible(&self, state: &PoolState) -> bool {
        state.ack_count == self.outbox.peer_count()
            && state
                .queue
                .within_capacity(self.local_id(), self.capacity as usize)
    }

    /// Wake the waiter if the predicate holds for the locked state
    fn signal_if_admissible(&self, state: &PoolState) {
        if self.admissible(state) {
            self.admitted.notify_one();
        }
    }

    /// Reset the ACK count and broadcast a REQUEST for this pool
    pub async fn request_admission(&self) -> Result<LamportTime, TransportError> {
        self.lock().ack_count = 0;
        let ts = self
            .outbox
            .broadcast(MessageKind::Request, self.class)
            .await?;
        tracing::debug!(peer = %self.local_id(), class = %self.class, ts, "requested admission");
        Ok(ts)
    }

    /// Full quorum and a rank within capacity
    pub fn admission_predicate(&self) -> bool {
        let state = self.lock();
        self.admissible(&state)
    }

    /// Block until admitted or stopped
    ///
    /// Wakeups are hints; the predicate is re-checked after every one, and
    /// `poll` bounds each wait in case a signal is missed.
    pub async fn wait_for_admission(&self, poll: Duration, stop: &StopSignal) -> Admission {
        loop {
            if self.admission_predicate() {
                return Admission::Granted;
            }
            if stop.is_stopped() {
                return Admission::Stopped;
            }
            tokio::select! {
                _ = self.admitted.notified() => {}
                _ = tokio::time::sleep(poll) => {}
                _ = stop.wait() => {}
            }
        }
    }

    /// A REQUEST arrived (possibly this peer's own)
    pub fn on_request(&self, request: PendingRequest) -> InsertOutcome {
        let mut state = self.lock();
        let outcome = state.queue.insert(request);
        match outcome {
            InsertOutcome::Inserted => tracing::debug!(
                peer = %self.local_id(),
                class = %self.class,
                requester = %request.requester,
                ts = request.timestamp,
                "queued request"
            ),
            InsertOutcome::Duplicate { existing } => tracing::warn!(
                peer = %self.local_id(),
                class = %self.class,
                requester = %request.requester,
                ts = request.timestamp,
                existing,
                "ignoring duplicate request"
            ),
        }
        self.signal_if_admissible(&state);
        outcome
    }

    /// An ACK for this peer's current request arrived
    pub fn on_ack(&self, from: PeerId) {
        let mut state = self.lock();
        if state.ack_count < self.outbox.peer_count() {
            state.ack_count += 1;
        } else {
            tracing::warn!(peer = %self.local_id(), class = %self.class, %from, "ACK beyond quorum");
        }
        self.signal_if_admissible(&state);
    }

    /// A RELEASE arrived; removing an absent requester is a no-op
    pub fn on_release(&self, requester: PeerId) -> Option<PendingRequest> {
        let mut state = self.lock();
        let removed = state.queue.remove(requester);
        if removed.is_none() {
            if requester == self.local_id() {
                tracing::trace!(peer = %self.local_id(), class = %self.class, "own release echoed");
            } else {
                tracing::warn!(
                    peer = %self.local_id(),
                    class = %self.class,
                    %requester,
                    "release for unknown request"
                );
            }
        }
        if !state.queue.is_empty() {
            self.signal_if_admissible(&state);
        }
        removed
    }

    /// Drop this peer's entry and broadcast RELEASE
    ///
    /// Safe to call with no entry queued: the RELEASE still goes out so
    /// peers that queued an in-flight REQUEST drop it too.
    pub async fn release(&self) -> Result<Option<PendingRequest>, TransportError> {
        let removed = self.lock().queue.remove(self.local_id());
        self.outbox
            .broadcast(MessageKind::Release, self.class)
            .await?;
        Ok(removed)
    }

    /// Mark this peer's entry for the acquisition stamped `timestamp` as
    /// vacated. Returns `false` if that acquisition is no longer queued.
    pub fn vacate(&self, timestamp: LamportTime) -> bool {
        let local = self.local_id();
        let mut state = self.lock();
        let vacated = state.queue.vacate(local, timestamp);
        if vacated {
            self.signal_if_admissible(&state);
        }
        vacated
    }

    /// Broadcast RELEASE for an entry already vacated locally
    pub async fn announce_release(&self) -> Result<LamportTime, TransportError> {
        self.outbox
            .broadcast(MessageKind::Release, self.class)
            .await
    }

    /// The timestamp of this peer's queued request, if any
    pub fn local_request(&self) -> Option<LamportTime> {
        let local = self.local_id();
        self.lock().queue.get(local).map(|r| r.timestamp)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        PoolSnapshot {
            class: self.class,
            capacity: self.capacity,
            ack_count: state.ack_count,
            queue: state.queue.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
