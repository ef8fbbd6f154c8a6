// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Occupancy checking over the global event trace.
//!
//! A peer counts as holding a slot from its `Holding(class)` transition
//! until its `SlotVacated` event for that class. Both are published before
//! the messages that let other peers react, so the order events arrive on a
//! shared channel is a valid order for checking k-exclusion.

use kex_core::{PeerEvent, PeerId, PeerState, ResourceClass};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// More holders than a pool's capacity at one point in the trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub class: ResourceClass,
    pub capacity: u32,
    pub holders: Vec<PeerId>,
    /// Position of the offending event in the trace
    pub event: u64,
}

/// Observed use of one pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    pub class: ResourceClass,
    pub capacity: u32,
    pub admissions: u64,
    pub max_holders: usize,
    /// Longest time between admission and vacate, as observed
    pub longest_hold_ms: u64,
}

/// Summary of a checked trace
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub events: u64,
    pub pools: Vec<PoolReport>,
    pub violations: Vec<Violation>,
}

#[derive(Default)]
struct PoolWatch {
    capacity: u32,
    holders: BTreeMap<PeerId, Instant>,
    admissions: u64,
    max_holders: usize,
    longest_hold: Duration,
}

pub struct OccupancyMonitor {
    pools: [PoolWatch; 2],
    events: u64,
    violations: Vec<Violation>,
}

impl OccupancyMonitor {
    /// `capacities` is indexed by [`ResourceClass::index`]
    pub fn new(capacities: [u32; 2]) -> Self {
        Self {
            pools: capacities.map(|capacity| PoolWatch {
                capacity,
                ..PoolWatch::default()
            }),
            events: 0,
            violations: Vec::new(),
        }
    }

    /// Consume events until every sender is gone
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PeerEvent>) -> Occupancy {
        while let Some(event) = rx.recv().await {
            self.observe(&event);
        }
        self.report()
    }

    pub fn observe(&mut self, event: &PeerEvent) {
        self.events += 1;
        match event {
            PeerEvent::StateChanged {
                peer,
                to: PeerState::Holding(class),
                ..
            } => self.enter(*peer, *class),
            PeerEvent::SlotVacated { peer, class, .. } => self.leave(*peer, *class),
            _ => {}
        }
    }

    fn enter(&mut self, peer: PeerId, class: ResourceClass) {
        let watch = &mut self.pools[class.index()];
        watch.holders.insert(peer, Instant::now());
        watch.admissions += 1;
        watch.max_holders = watch.max_holders.max(watch.holders.len());

        if watch.holders.len() > watch.capacity as usize {
            let holders: Vec<PeerId> = watch.holders.keys().copied().collect();
            tracing::error!(%class, capacity = watch.capacity, ?holders, "k-exclusion violated");
            self.violations.push(Violation {
                class,
                capacity: watch.capacity,
                holders,
                event: self.events,
            });
        }
    }

    fn leave(&mut self, peer: PeerId, class: ResourceClass) {
        let watch = &mut self.pools[class.index()];
        match watch.holders.remove(&peer) {
            Some(since) => watch.longest_hold = watch.longest_hold.max(since.elapsed()),
            None => tracing::warn!(%peer, %class, "vacate without a matching admission"),
        }
    }

    /// Peers currently counted as holding `class`
    pub fn holders(&self, class: ResourceClass) -> Vec<PeerId> {
        self.pools[class.index()].holders.keys().copied().collect()
    }

    pub fn report(&self) -> Occupancy {
        Occupancy {
            events: self.events,
            pools: ResourceClass::ALL
                .iter()
                .map(|&class| {
                    let watch = &self.pools[class.index()];
                    PoolReport {
                        class,
                        capacity: watch.capacity,
                        admissions: watch.admissions,
                        max_holders: watch.max_holders,
                        longest_hold_ms: watch.longest_hold.as_millis() as u64,
                    }
                })
                .collect(),
            violations: self.violations.clone(),
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
