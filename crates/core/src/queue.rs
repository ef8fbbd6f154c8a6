// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-request queue ordered by `(timestamp, requester)`
//!
//! Each peer keeps its own replica. Replicas converge because the ordering
//! depends only on values carried in every REQUEST, never on arrival order.

use crate::clock::LamportTime;
use crate::id::PeerId;
use crate::message::ResourceClass;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether a queued request still competes for a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Active,
    /// Forcibly released by a lease; skipped when ranking
    Vacated,
}

/// A REQUEST recorded in a peer's local queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub requester: PeerId,
    pub timestamp: LamportTime,
    pub class: ResourceClass,
    pub status: RequestStatus,
}

impl PendingRequest {
    pub fn new(requester: PeerId, timestamp: LamportTime, class: ResourceClass) -> Self {
        Self {
            requester,
            timestamp,
            class,
            status: RequestStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RequestStatus::Active
    }

    /// Admission priority: lower sorts first
    pub fn priority(&self) -> (LamportTime, PeerId) {
        (self.timestamp, self.requester)
    }

    /// Total order shared by every peer
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

/// Result of inserting a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The requester already had an entry; the queue is unchanged
    Duplicate { existing: LamportTime },
}

/// Sorted queue of pending requests for one resource class
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestQueue {
    entries: Vec<PendingRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in priority order, de-duplicating by requester
    pub fn insert(&mut self, request: PendingRequest) -> InsertOutcome {
        if let Some(existing) = self.get(request.requester) {
            return InsertOutcome::Duplicate {
                existing: existing.timestamp,
            };
        }
        let position = self
            .entries
            .partition_point(|e| e.cmp_priority(&request) == Ordering::Less);
        self.entries.insert(position, request);
        InsertOutcome::Inserted
    }

    /// Remove the requester's entry, if any
    pub fn remove(&mut self, requester: PeerId) -> Option<PendingRequest> {
        let position = self.entries.iter().position(|e| e.requester == requester)?;
        Some(self.entries.remove(position))
    }

    /// Mark the requester's entry vacated if it is the one stamped `timestamp`
    pub fn vacate(&mut self, requester: PeerId, timestamp: LamportTime) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.requester == requester && e.timestamp == timestamp)
        {
            Some(entry) if entry.is_active() => {
                entry.status = RequestStatus::Vacated;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, requester: PeerId) -> Option<&PendingRequest> {
        self.entries.iter().find(|e| e.requester == requester)
    }

    /// Zero-based rank of the requester among active entries
    pub fn rank_of(&self, requester: PeerId) -> Option<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_active())
            .position(|e| e.requester == requester)
    }

    /// Whether the requester is within the first `capacity` active entries
    pub fn within_capacity(&self, requester: PeerId, capacity: usize) -> bool {
        self.rank_of(requester).is_some_and(|rank| rank < capacity)
    }

    /// Requesters in priority order
    pub fn order(&self) -> Vec<PeerId> {
        self.entries.iter().map(|e| e.requester).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
