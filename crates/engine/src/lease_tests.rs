// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::outbox::Outbox;
use kex_adapters::{FakeTransport, TransportError};
use kex_core::{LamportClock, Message, MessageKind, PeerEvent, PendingRequest};

const LEASE: Duration = Duration::from_secs(1);

struct Harness {
    fake: FakeTransport,
    pool: Arc<PoolController<FakeTransport>>,
    stop: StopSignal,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    leases: LeaseManager<FakeTransport>,
}

fn harness() -> Harness {
    let fake = FakeTransport::new(PeerId(0), 2);
    let outbox = Outbox::new(Arc::new(LamportClock::new(PeerId(0))), fake.clone());
    let pool = Arc::new(PoolController::new(ResourceClass::A, 1, Arc::new(outbox)));
    let stop = StopSignal::new();
    let (tx, events) = mpsc::unbounded_channel();
    let leases = LeaseManager::new(PeerId(0), Arc::clone(&pool), EventSink::new(tx), stop.clone());
    Harness {
        fake,
        pool,
        stop,
        events,
        leases,
    }
}

impl Harness {
    /// Queue this peer's acquisition stamped `ts`
    fn hold(&self, ts: LamportTime) {
        self.pool
            .on_request(PendingRequest::new(PeerId(0), ts, ResourceClass::A));
    }
}

fn releases(fake: &FakeTransport) -> usize {
    fake.messages()
        .iter()
        .filter(|(_, m)| m.kind == MessageKind::Release)
        .count()
}

#[tokio::test(start_paused = true)]
async fn lease_vacates_at_deadline() {
    let mut h = harness();
    h.hold(4);

    let ticket = h.leases.start_lease(4, LEASE).unwrap();
    assert!(!ticket.is_expired());
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.reason, VacateReason::LeaseExpired);
    assert!(outcome.released);
    assert_eq!(outcome.held_for, LEASE);
    assert_eq!(
        h.fake.messages(),
        vec![(None, Message::release(PeerId(0), 1, ResourceClass::A))]
    );
    assert_eq!(h.pool.snapshot().queue[0].status, kex_core::RequestStatus::Vacated);
    assert_eq!(
        h.events.try_recv().unwrap(),
        PeerEvent::SlotVacated {
            peer: PeerId(0),
            class: ResourceClass::A,
            reason: VacateReason::LeaseExpired,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn lease_does_not_fire_early() {
    let h = harness();
    h.hold(4);

    let ticket = h.leases.start_lease(4, LEASE).unwrap();
    tokio::time::sleep(LEASE - Duration::from_millis(1)).await;

    assert!(!ticket.is_expired());
    assert_eq!(releases(&h.fake), 0);
}

#[tokio::test(start_paused = true)]
async fn expire_now_fires_before_deadline() {
    let h = harness();
    h.hold(4);

    let mut ticket = h.leases.start_lease(4, LEASE).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    ticket.expire_now();
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.reason, VacateReason::EarlyRelease);
    assert_eq!(outcome.held_for, Duration::from_millis(10));
    assert_eq!(releases(&h.fake), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_fires_outstanding_leases() {
    let h = harness();
    h.hold(4);

    let ticket = h.leases.start_lease(4, Duration::from_secs(3600)).unwrap();
    h.stop.trigger();
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.reason, VacateReason::Shutdown);
    assert!(outcome.held_for < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn lease_on_a_released_slot_sends_nothing() {
    let h = harness();
    h.hold(4);
    h.pool.on_release(PeerId(0));

    let outcome = h.leases.start_lease(4, LEASE).unwrap().outcome().await.unwrap();

    assert!(!outcome.released);
    assert_eq!(releases(&h.fake), 0);
}

#[tokio::test(start_paused = true)]
async fn lease_for_an_older_acquisition_is_ignored() {
    let h = harness();
    h.hold(9);

    let outcome = h.leases.start_lease(4, LEASE).unwrap().outcome().await.unwrap();

    assert!(!outcome.released);
    assert_eq!(h.pool.local_request(), Some(9));
    assert!(h.pool.snapshot().queue[0].is_active());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_is_reported_on_the_ticket() {
    let h = harness();
    h.hold(4);
    h.fake.fail_with(TransportError::Disconnected(PeerId(1)));

    let result = h.leases.start_lease(4, LEASE).unwrap().outcome().await;

    assert_eq!(
        result,
        Err(EngineError::Transport(TransportError::Disconnected(PeerId(1))))
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_reaps_every_worker() {
    let h = harness();
    for ts in 1..=5 {
        h.hold(ts);
        let outcome = h.leases.start_lease(ts, LEASE).unwrap().outcome().await.unwrap();
        assert!(outcome.released);
        h.pool.on_release(PeerId(0));
    }
    // Still running when shutdown starts
    h.hold(6);
    let pending = h.leases.start_lease(6, LEASE).unwrap();

    let reaped = h.leases.shutdown().await;

    assert_eq!(reaped, 6);
    assert!(pending.is_expired());
}

#[tokio::test(start_paused = true)]
async fn dropped_ticket_still_releases() {
    let h = harness();
    h.hold(4);

    drop(h.leases.start_lease(4, LEASE).unwrap());
    let reaped = h.leases.shutdown().await;

    assert_eq!(reaped, 1);
    assert_eq!(releases(&h.fake), 1);
}
