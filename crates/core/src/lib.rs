// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kex-core: data model for distributed k-exclusion
//!
//! This crate provides:
//! - The Lamport clock shared by a peer's receiver and business-logic paths
//! - The REQUEST/ACK/RELEASE wire format
//! - The pending-request queue and its total order
//! - Peer states and transition events
//! - Cluster configuration

pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod message;
pub mod queue;

// Re-exports
pub use clock::{LamportClock, LamportTime};
pub use config::{ClusterConfig, ConfigError, PoolConfig, ReleasePolicy};
pub use event::{PeerEvent, PeerState, VacateReason};
pub use id::PeerId;
pub use message::{
    Frame, FrameError, Message, MessageKind, ResourceClass, WireMessage, FRAME_LEN,
};
pub use queue::{InsertOutcome, PendingRequest, RequestQueue, RequestStatus};
