// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Distributed k-exclusion engine: per-peer pools, receiver loop, leases
//! and the acquire/hold/release state machine

mod cluster;
mod error;
mod events;
mod lease;
mod monitor;
mod node;
mod outbox;
mod peer;
mod pool;
mod router;
mod stop;

pub use cluster::{Cluster, ClusterReport, PeerReport};
pub use error::{ClusterError, EngineError};
pub use events::EventSink;
pub use lease::{LeaseManager, LeaseOutcome, LeaseState, LeaseTicket, LeaseTimer};
pub use monitor::{Occupancy, OccupancyMonitor, PoolReport, Violation};
pub use node::{Node, NodeHandle};
pub use outbox::Outbox;
pub use peer::{PeerEngine, PeerStats};
pub use pool::{Admission, PoolController, PoolSnapshot};
pub use router::{MessageRouter, RouterStats};
pub use stop::StopSignal;
