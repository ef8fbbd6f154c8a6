// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One peer: a receiver task and an engine task sharing two pools

use crate::error::EngineError;
use crate::events::EventSink;
use crate::outbox::Outbox;
use crate::peer::{PeerEngine, PeerStats};
use crate::pool::PoolController;
use crate::router::{MessageRouter, RouterStats};
use crate::stop::StopSignal;
use kex_adapters::{Inbox, Transport};
use kex_core::{ClusterConfig, LamportClock, PeerId, ResourceClass};
use std::sync::Arc;
use tokio::sync::Barrier;
use tokio::task::JoinHandle;

/// A peer wired up but not yet running
pub struct Node<T, I> {
    id: PeerId,
    pools: [Arc<PoolController<T>>; 2],
    router: MessageRouter<T, I>,
    engine: PeerEngine<T>,
}

/// Tasks of a running peer
pub struct NodeHandle {
    pub id: PeerId,
    pub engine: JoinHandle<Result<PeerStats, EngineError>>,
    pub router: JoinHandle<Result<RouterStats, EngineError>>,
}

impl<T: Transport, I: Inbox> Node<T, I> {
    /// Must be called from within a Tokio runtime
    pub fn new(
        config: &ClusterConfig,
        transport: T,
        inbox: I,
        events: EventSink,
        stop: StopSignal,
    ) -> Self {
        let id = transport.local_id();
        let clock = Arc::new(LamportClock::new(id));
        let outbox = Arc::new(Outbox::new(clock, transport));
        let pools = ResourceClass::ALL.map(|class| {
            Arc::new(PoolController::new(
                class,
                config.pool(class).capacity,
                Arc::clone(&outbox),
            ))
        });
        let router = MessageRouter::new(
            inbox,
            outbox,
            pools.clone(),
            config.poll_interval,
            stop.clone(),
        );
        let engine = PeerEngine::new(config, pools.clone(), events, stop);
        Self {
            id,
            pools,
            router,
            engine,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn pool(&self, class: ResourceClass) -> Arc<PoolController<T>> {
        Arc::clone(&self.pools[class.index()])
    }

    /// Start the receiver now and the engine once every peer reaches `barrier`
    pub fn spawn(self, barrier: Arc<Barrier>) -> NodeHandle {
        let id = self.id;
        let router = tokio::spawn(self.router.run());
        let engine = self.engine;
        let engine = tokio::spawn(async move {
            barrier.wait().await;
            tracing::debug!(peer = %id, "passed startup barrier");
            engine.run().await
        });
        NodeHandle { id, engine, router }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
