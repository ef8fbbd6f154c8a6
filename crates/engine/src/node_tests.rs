// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::lease::LeaseManager;
use crate::pool::Admission;
use kex_adapters::LocalNetwork;
use kex_core::{PeerEvent, PeerState, PoolConfig, VacateReason};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const POLL: Duration = Duration::from_millis(5);
const LEASE: Duration = Duration::from_millis(200);

fn config() -> ClusterConfig {
    ClusterConfig::new(2)
        .with_cycles(1)
        .with_poll_interval(POLL)
        .with_pool(
            ResourceClass::A,
            PoolConfig::new(1, Duration::from_millis(10)).with_lease(LEASE),
        )
        .with_pool(ResourceClass::B, PoolConfig::new(1, Duration::from_millis(10)))
}

#[tokio::test(start_paused = true)]
async fn lease_reclaims_slot_from_a_crashed_holder() {
    let config = config();
    let stop = StopSignal::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut network = LocalNetwork::build(2).into_iter();
    let (t0, i0) = network.next().unwrap();
    let (t1, i1) = network.next().unwrap();

    let crashed = Node::new(&config, t0, i0, EventSink::new(tx.clone()), stop.clone());
    let survivor = Node::new(&config, t1, i1, EventSink::new(tx.clone()), stop.clone());
    let barrier = Arc::new(Barrier::new(2));
    let survivor = survivor.spawn(Arc::clone(&barrier));

    // Peer 0 acquires A by hand, arms its lease, and never releases
    let pool_a = crashed.pool(ResourceClass::A);
    let crashed_router = tokio::spawn(crashed.router.run());
    let ts = pool_a.request_admission().await.unwrap();
    assert_eq!(pool_a.wait_for_admission(POLL, &stop).await, Admission::Granted);
    let leases = LeaseManager::new(PeerId(0), Arc::clone(&pool_a), EventSink::new(tx), stop.clone());
    let _ticket = leases.start_lease(ts, LEASE).unwrap();
    let admitted_at = Instant::now();
    drop(crashed.engine);

    // Let peer 1 start competing for A
    barrier.wait().await;

    let mut saw_vacate = false;
    loop {
        match rx.recv().await.unwrap() {
            PeerEvent::SlotVacated {
                peer: PeerId(0),
                class: ResourceClass::A,
                reason,
            } => {
                assert_eq!(reason, VacateReason::LeaseExpired);
                saw_vacate = true;
            }
            PeerEvent::StateChanged {
                peer: PeerId(1),
                to: PeerState::Holding(ResourceClass::A),
                ..
            } => break,
            _ => {}
        }
    }
    assert!(saw_vacate, "peer 1 admitted before peer 0's lease fired");
    assert!(admitted_at.elapsed() >= LEASE);

    let stats = survivor.engine.await.unwrap().unwrap();
    assert_eq!(stats.cycles, 1);
    stop.trigger();
    survivor.router.await.unwrap().unwrap();
    crashed_router.await.unwrap().unwrap();
    assert_eq!(leases.shutdown().await, 1);
}

#[tokio::test(start_paused = true)]
async fn two_peers_take_turns_on_single_slots() {
    let config = config();
    let stop = StopSignal::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = LocalNetwork::build(2)
        .into_iter()
        .map(|(transport, inbox)| {
            Node::new(&config, transport, inbox, EventSink::new(tx.clone()), stop.clone())
                .spawn(Arc::clone(&barrier))
        })
        .collect();
    drop(tx);

    let mut routers = Vec::new();
    for handle in handles {
        assert_eq!(handle.engine.await.unwrap().unwrap().cycles, 1);
        routers.push(handle.router);
    }
    stop.trigger();
    for router in routers {
        router.await.unwrap().unwrap();
    }

    let mut holding_a = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            PeerEvent::StateChanged {
                peer,
                to: PeerState::Holding(ResourceClass::A),
                ..
            } => {
                assert!(holding_a.is_empty(), "{} admitted while {:?} holds A", peer, holding_a);
                holding_a.push(peer);
            }
            PeerEvent::SlotVacated {
                peer,
                class: ResourceClass::A,
                ..
            } => holding_a.retain(|p| *p != peer),
            _ => {}
        }
    }
}

#[tokio::test(start_paused = true)]
async fn pool_b_is_never_held_after_the_a_lease_fires() {
    // Both peers share A; the slower one waits for B longer than its A lease
    let config = ClusterConfig::new(2)
        .with_cycles(1)
        .with_poll_interval(POLL)
        .with_pool(
            ResourceClass::A,
            PoolConfig::new(2, Duration::from_millis(5)).with_lease(Duration::from_millis(30)),
        )
        .with_pool(ResourceClass::B, PoolConfig::new(1, Duration::from_millis(100)));
    let stop = StopSignal::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = LocalNetwork::build(2)
        .into_iter()
        .map(|(transport, inbox)| {
            Node::new(&config, transport, inbox, EventSink::new(tx.clone()), stop.clone())
                .spawn(Arc::clone(&barrier))
        })
        .collect();
    drop(tx);

    let mut skipped_b = 0;
    let mut routers = Vec::new();
    for handle in handles {
        let stats = handle.engine.await.unwrap().unwrap();
        assert_eq!(stats.cycles, 1);
        skipped_b += stats.skipped_b;
        routers.push(handle.router);
    }
    stop.trigger();
    for router in routers {
        router.await.unwrap().unwrap();
    }

    let mut lost_a = [false; 2];
    while let Some(event) = rx.recv().await {
        match event {
            PeerEvent::StateChanged {
                peer,
                to: PeerState::Holding(ResourceClass::A),
                ..
            } => lost_a[peer.index()] = false,
            PeerEvent::SlotVacated {
                peer,
                class: ResourceClass::A,
                ..
            } => lost_a[peer.index()] = true,
            PeerEvent::StateChanged {
                peer,
                to: PeerState::Holding(ResourceClass::B),
                ..
            } => assert!(!lost_a[peer.index()], "{} holds B without A", peer),
            _ => {}
        }
    }
    assert_eq!(skipped_b, 1);
}
