// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer state-machine cursor and the transition events it publishes

use crate::id::PeerId;
use crate::message::ResourceClass;
use serde::{Deserialize, Serialize};

/// Where a peer is in its acquire/hold/release cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerState {
    #[default]
    Idle,
    Requesting(ResourceClass),
    Waiting(ResourceClass),
    Holding(ResourceClass),
    Releasing(ResourceClass),
}

impl std::fmt::Display for PeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerState::Idle => write!(f, "Idle"),
            PeerState::Requesting(class) => write!(f, "Requesting{}", class),
            PeerState::Waiting(class) => write!(f, "Waiting{}", class),
            PeerState::Holding(class) => write!(f, "Holding{}", class),
            PeerState::Releasing(class) => write!(f, "Releasing{}", class),
        }
    }
}

/// Why a held slot was given up
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VacateReason {
    /// Released by the business logic
    Explicit,
    /// Lease deadline passed
    LeaseExpired,
    /// Lease expired on request, before its deadline
    EarlyRelease,
    /// Lease fired because the peer is stopping
    Shutdown,
}

/// Observable transitions, published in the order they happen
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerEvent {
    StateChanged {
        peer: PeerId,
        from: PeerState,
        to: PeerState,
    },
    /// A held slot was vacated. Published before the RELEASE is sent.
    SlotVacated {
        peer: PeerId,
        class: ResourceClass,
        reason: VacateReason,
    },
    /// A queued request was withdrawn without ever being admitted
    RequestAbandoned { peer: PeerId, class: ResourceClass },
    /// One full acquire/hold/release cycle finished
    CycleCompleted { peer: PeerId, cycle: u32 },
}
