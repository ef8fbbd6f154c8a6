// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kex_adapters::FakeTransport;

fn outbox(fake: &FakeTransport) -> Outbox<FakeTransport> {
    Outbox::new(Arc::new(LamportClock::new(fake.local_id())), fake.clone())
}

#[tokio::test]
async fn every_send_is_preceded_by_an_increment() {
    let fake = FakeTransport::new(PeerId(1), 3);
    let outbox = outbox(&fake);

    let first = outbox
        .broadcast(MessageKind::Request, ResourceClass::A)
        .await
        .unwrap();
    let second = outbox
        .send(PeerId(2), MessageKind::Ack, ResourceClass::B)
        .await
        .unwrap();

    assert_eq!((first, second), (1, 2));
    assert_eq!(
        fake.messages(),
        vec![
            (None, Message::request(PeerId(1), 1, ResourceClass::A)),
            (Some(PeerId(2)), Message::ack(PeerId(1), 2, ResourceClass::B)),
        ]
    );
}

#[tokio::test]
async fn stamps_follow_observed_clock() {
    let fake = FakeTransport::new(PeerId(0), 2);
    let outbox = outbox(&fake);
    outbox.clock().observe(41);

    let ts = outbox
        .broadcast(MessageKind::Release, ResourceClass::A)
        .await
        .unwrap();

    assert_eq!(ts, 43);
}

#[tokio::test]
async fn concurrent_senders_leave_in_timestamp_order() {
    let fake = FakeTransport::new(PeerId(0), 4);
    let outbox = Arc::new(outbox(&fake));

    let mut handles = Vec::new();
    for i in 0..16u32 {
        let outbox = Arc::clone(&outbox);
        handles.push(tokio::spawn(async move {
            outbox
                .send(PeerId(i % 4), MessageKind::Ack, ResourceClass::A)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stamps: Vec<_> = fake.messages().iter().map(|(_, m)| m.clock).collect();
    assert_eq!(stamps, (1..=16).collect::<Vec<_>>());
}

#[tokio::test]
async fn transport_failures_surface() {
    let fake = FakeTransport::new(PeerId(0), 2);
    fake.fail_with(TransportError::Closed);
    let outbox = outbox(&fake);

    let result = outbox.broadcast(MessageKind::Request, ResourceClass::A).await;

    assert_eq!(result, Err(TransportError::Closed));
}
