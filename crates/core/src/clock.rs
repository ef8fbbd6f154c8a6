// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lamport clock shared by the receiver and business-logic paths

use crate::id::PeerId;
use std::sync::Mutex;

/// Logical timestamp carried by every message
pub type LamportTime = u32;

/// Scalar Lamport clock owned by one peer.
///
/// Every read-modify-write happens under the clock's own lock. The lock is
/// never held across a send; callers stamp first, then send.
#[derive(Debug)]
pub struct LamportClock {
    owner: PeerId,
    value: Mutex<LamportTime>,
}

impl LamportClock {
    pub fn new(owner: PeerId) -> Self {
        Self::starting_at(owner, 0)
    }

    /// Create a clock that resumes from a known value
    pub fn starting_at(owner: PeerId, value: LamportTime) -> Self {
        Self {
            owner,
            value: Mutex::new(value),
        }
    }

    pub fn owner(&self) -> PeerId {
        self.owner
    }

    /// Current value without advancing
    pub fn now(&self) -> LamportTime {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance for a local causal step (every send is preceded by one)
    pub fn increment(&self) -> LamportTime {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = value.saturating_add(1);
        *value
    }

    /// Take the max of the local and foreign value, without advancing
    pub fn merge(&self, foreign: LamportTime) -> LamportTime {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = (*value).max(foreign);
        *value
    }

    /// Lamport receive rule: merge the foreign value, then advance
    pub fn observe(&self, foreign: LamportTime) -> LamportTime {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = (*value).max(foreign).saturating_add(1);
        *value
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
