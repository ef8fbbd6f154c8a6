// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process cluster: assigns ranks, aligns startup, collects results

use crate::error::{ClusterError, EngineError};
use crate::events::EventSink;
use crate::monitor::{Occupancy, OccupancyMonitor, PoolReport, Violation};
use crate::node::{Node, NodeHandle};
use crate::peer::PeerStats;
use crate::router::RouterStats;
use crate::stop::StopSignal;
use kex_adapters::{LocalNetwork, TracedInbox, TracedTransport, Transport};
use kex_core::{ClusterConfig, PeerId, ResourceClass};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Barrier};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

/// Per-peer results
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerReport {
    pub peer: PeerId,
    #[serde(flatten)]
    pub stats: PeerStats,
    pub router: RouterStats,
}

/// Everything a finished run observed
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClusterReport {
    pub peers: Vec<PeerReport>,
    pub pools: Vec<PoolReport>,
    pub violations: Vec<Violation>,
    pub events: u64,
    pub elapsed_ms: u64,
}

impl ClusterReport {
    /// No pool ever exceeded its capacity
    pub fn is_safe(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn total_cycles(&self) -> u64 {
        self.peers.iter().map(|p| u64::from(p.stats.cycles)).sum()
    }

    pub fn pool(&self, class: ResourceClass) -> Option<&PoolReport> {
        self.pools.iter().find(|p| p.class == class)
    }
}

/// A running cluster of peers over an in-process network
pub struct Cluster {
    nodes: Vec<NodeHandle>,
    monitor: JoinHandle<Occupancy>,
    stop: StopSignal,
    started: Instant,
}

impl Cluster {
    /// Validate `config` and start every peer.
    ///
    /// Must be called from within a Tokio runtime. Raising `stop` asks every
    /// peer to finish its current cycle and exit.
    pub fn start(config: &ClusterConfig, stop: StopSignal) -> Result<Self, ClusterError> {
        config.validate()?;
        tracing::info!(
            peers = config.peers,
            capacity_a = config.pool_a.capacity,
            capacity_b = config.pool_b.capacity,
            cycles = ?config.cycles,
            "starting cluster"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let capacities = ResourceClass::ALL.map(|class| config.pool(class).capacity);
        let monitor = tokio::spawn(OccupancyMonitor::new(capacities).run(rx));

        let barrier = Arc::new(Barrier::new(config.peers as usize));
        let nodes = LocalNetwork::build(config.peers)
            .into_iter()
            .map(|(transport, inbox)| {
                let id = transport.local_id();
                Node::new(
                    config,
                    TracedTransport::new(transport),
                    TracedInbox::new(id, inbox),
                    EventSink::new(tx.clone()),
                    stop.clone(),
                )
                .spawn(Arc::clone(&barrier))
            })
            .collect();

        Ok(Self {
            nodes,
            monitor,
            stop,
            started: Instant::now(),
        })
    }

    pub fn peer_count(&self) -> usize {
        self.nodes.len()
    }

    /// Wait for every peer to finish and report what happened.
    ///
    /// Engines are joined first; receivers keep acknowledging until the last
    /// engine is done, then the stop signal ends them. The first failing
    /// peer, by rank, is reported as the error.
    pub async fn wait(self) -> Result<ClusterReport, ClusterError> {
        let mut engines = Vec::with_capacity(self.nodes.len());
        let mut routers = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            engines.push((node.id, node.engine));
            routers.push(node.router);
        }

        let mut engine_results = Vec::with_capacity(engines.len());
        for (id, engine) in engines {
            engine_results.push((id, joined(id, "engine", engine.await)));
        }
        self.stop.trigger();

        let mut peers = Vec::with_capacity(engine_results.len());
        let mut failure = None;
        for ((id, engine), router) in engine_results.into_iter().zip(routers) {
            let router = joined(id, "router", router.await);
            match (engine, router) {
                (Ok(stats), Ok(router)) => peers.push(PeerReport {
                    peer: id,
                    stats,
                    router,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    failure.get_or_insert(e);
                }
            }
        }

        let occupancy = monitored(self.monitor.await)?;
        if let Some(failure) = failure {
            return Err(failure);
        }

        let elapsed = self.started.elapsed();
        tracing::info!(
            elapsed_ms = as_millis(elapsed),
            violations = occupancy.violations.len(),
            "cluster finished"
        );
        Ok(ClusterReport {
            peers,
            pools: occupancy.pools,
            violations: occupancy.violations,
            events: occupancy.events,
            elapsed_ms: as_millis(elapsed),
        })
    }
}

fn joined<V>(
    peer: PeerId,
    task: &'static str,
    result: Result<Result<V, EngineError>, JoinError>,
) -> Result<V, ClusterError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(ClusterError::PeerFailed { peer, source }),
        Err(e) => {
            tracing::error!(%peer, task, error = %e, "task did not finish");
            Err(ClusterError::TaskPanicked { peer, task })
        }
    }
}

fn monitored(result: Result<Occupancy, JoinError>) -> Result<Occupancy, ClusterError> {
    result.map_err(|e| {
        tracing::error!(error = %e, "occupancy monitor failed");
        ClusterError::MonitorFailed(e)
    })
}

fn as_millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
