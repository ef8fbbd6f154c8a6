// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The acquire/hold/release cycle of one peer
//!
//! ```text
//! Idle → RequestingA → WaitingA → HoldingA → RequestingB → WaitingB
//!      → HoldingB → ReleasingB → ReleasingA → Idle
//! ```

use crate::error::EngineError;
use crate::events::EventSink;
use crate::lease::{LeaseManager, LeaseTicket};
use crate::pool::{Admission, PoolController};
use crate::stop::StopSignal;
use kex_adapters::Transport;
use kex_core::{
    ClusterConfig, LamportTime, PeerEvent, PeerId, PeerState, ReleasePolicy, ResourceClass,
    VacateReason,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Counters kept by one engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PeerStats {
    /// Full cycles completed
    pub cycles: u32,
    /// Requests withdrawn because the peer stopped while waiting
    pub abandoned: u32,
    /// Cycles that gave up pool B because the A lease ran out first
    pub skipped_b: u32,
    /// Leases that fired at their deadline
    pub leases_expired: u32,
    /// Leases expired early on request
    pub early_releases: u32,
    /// Lease workers joined by the cleanup tasks
    pub leases_reaped: usize,
}

/// Timing and release settings for one pool, as the engine sees them
#[derive(Clone, Copy, Debug)]
struct PoolPlan {
    hold: Duration,
    policy: ReleasePolicy,
}

/// A slot this peer currently holds
struct Held {
    timestamp: LamportTime,
    lease: Option<LeaseTicket>,
}

/// How a request ended
enum Acquisition {
    Granted(Held),
    /// Stopped before admission
    Abandoned,
    /// Admitted after the holding it depended on was vacated
    Withdrawn,
}

impl Held {
    fn lease_expired(&self) -> bool {
        self.lease.as_ref().is_some_and(LeaseTicket::is_expired)
    }
}

pub struct PeerEngine<T> {
    local: PeerId,
    pools: [Arc<PoolController<T>>; 2],
    plans: [PoolPlan; 2],
    leases: [Option<LeaseManager<T>>; 2],
    poll_interval: Duration,
    cycle_limit: Option<u32>,
    stop: StopSignal,
    events: EventSink,
    state: PeerState,
    stats: PeerStats,
}

impl<T: Transport> PeerEngine<T> {
    /// Must be called from within a Tokio runtime when any pool is leased
    pub fn new(
        config: &ClusterConfig,
        pools: [Arc<PoolController<T>>; 2],
        events: EventSink,
        stop: StopSignal,
    ) -> Self {
        let local = pools[0].local_id();
        let plans = ResourceClass::ALL.map(|class| {
            let pool = config.pool(class);
            PoolPlan {
                hold: pool.hold,
                policy: pool.release_policy(),
            }
        });
        let leases = ResourceClass::ALL.map(|class| match plans[class.index()].policy {
            ReleasePolicy::Leased { .. } => Some(LeaseManager::new(
                local,
                Arc::clone(&pools[class.index()]),
                events.clone(),
                stop.clone(),
            )),
            ReleasePolicy::Explicit => None,
        });

        Self {
            local,
            pools,
            plans,
            leases,
            poll_interval: config.poll_interval,
            cycle_limit: config.cycles,
            stop,
            events,
            state: PeerState::Idle,
            stats: PeerStats::default(),
        }
    }

    pub fn local_id(&self) -> PeerId {
        self.local
    }

    /// Run cycles until stopped or the cycle limit is reached.
    ///
    /// A fatal error raises the stop signal before it is returned. Lease
    /// workers are always drained before this returns.
    pub async fn run(mut self) -> Result<PeerStats, EngineError> {
        let result = self.run_cycles().await;
        if let Err(e) = &result {
            tracing::error!(peer = %self.local, state = %self.state, error = %e, "peer failed");
            self.stop.trigger();
        }

        for manager in self.leases.iter_mut() {
            if let Some(manager) = manager.take() {
                self.stats.leases_reaped += manager.shutdown().await;
            }
        }
        tracing::info!(peer = %self.local, cycles = self.stats.cycles, "peer stopped");

        result.map(|()| self.stats)
    }

    fn finished(&self) -> bool {
        self.stop.is_stopped()
            || self
                .cycle_limit
                .is_some_and(|limit| self.stats.cycles >= limit)
    }

    async fn run_cycles(&mut self) -> Result<(), EngineError> {
        while !self.finished() {
            self.cycle().await?;
        }
        Ok(())
    }

    /// One pass through the cycle. Returns early, with held slots
    /// released, if the peer is stopped while waiting.
    async fn cycle(&mut self) -> Result<(), EngineError> {
        let Acquisition::Granted(a) = self.acquire(ResourceClass::A, None).await? else {
            self.transition(PeerState::Idle);
            return Ok(());
        };
        self.hold(ResourceClass::A).await;

        let mut completed = true;
        if a.lease_expired() {
            // B may only be requested while A is held
            tracing::warn!(peer = %self.local, "pool A lease expired during use, skipping pool B");
            self.stats.skipped_b += 1;
        } else {
            match self.acquire(ResourceClass::B, Some(&a)).await? {
                Acquisition::Granted(b) => {
                    self.hold(ResourceClass::B).await;
                    self.release(ResourceClass::B, b).await?;
                }
                Acquisition::Withdrawn => {}
                Acquisition::Abandoned => completed = false,
            }
        }

        self.release(ResourceClass::A, a).await?;
        self.transition(PeerState::Idle);

        if completed {
            self.stats.cycles += 1;
            self.events.emit(PeerEvent::CycleCompleted {
                peer: self.local,
                cycle: self.stats.cycles,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: PeerState) {
        if self.state != to {
            self.events.state_changed(self.local, self.state, to);
            self.state = to;
        }
    }

    fn pool(&self, class: ResourceClass) -> &PoolController<T> {
        &self.pools[class.index()]
    }

    fn plan(&self, class: ResourceClass) -> PoolPlan {
        self.plans[class.index()]
    }

    /// Request a slot and wait for it.
    ///
    /// With `within`, the slot is only taken while that holding is still
    /// live; if its lease fired during the wait the request is withdrawn.
    async fn acquire(
        &mut self,
        class: ResourceClass,
        within: Option<&Held>,
    ) -> Result<Acquisition, EngineError> {
        self.transition(PeerState::Requesting(class));
        let requested = self
            .pool(class)
            .request_admission()
            .await
            .map_err(EngineError::from);
        let Some(timestamp) = self.tolerate_while_stopping(requested)? else {
            return Ok(Acquisition::Abandoned);
        };

        self.transition(PeerState::Waiting(class));
        let admission = self
            .pool(class)
            .wait_for_admission(self.poll_interval, &self.stop)
            .await;
        match admission {
            Admission::Granted if within.is_some_and(Held::lease_expired) => {
                tracing::warn!(
                    peer = %self.local,
                    %class,
                    ts = timestamp,
                    "outer lease expired while waiting, withdrawing request"
                );
                self.stats.skipped_b += 1;
                self.withdraw(class).await?;
                Ok(Acquisition::Withdrawn)
            }
            Admission::Granted => {
                self.transition(PeerState::Holding(class));
                let lease = match (&self.leases[class.index()], self.plan(class).policy) {
                    (Some(manager), ReleasePolicy::Leased { timeout, .. }) => {
                        Some(manager.start_lease(timestamp, timeout)?)
                    }
                    _ => None,
                };
                Ok(Acquisition::Granted(Held { timestamp, lease }))
            }
            Admission::Stopped => {
                self.events.emit(PeerEvent::RequestAbandoned {
                    peer: self.local,
                    class,
                });
                self.stats.abandoned += 1;
                self.withdraw(class).await?;
                Ok(Acquisition::Abandoned)
            }
        }
    }

    /// Give up a request that was never held
    async fn withdraw(&self, class: ResourceClass) -> Result<(), EngineError> {
        let released = self.pool(class).release().await.map_err(EngineError::from);
        self.tolerate_while_stopping(released)?;
        Ok(())
    }

    /// Simulated use of the resource
    async fn hold(&self, class: ResourceClass) {
        tokio::time::sleep(self.plan(class).hold).await;
    }

    async fn release(&mut self, class: ResourceClass, held: Held) -> Result<(), EngineError> {
        self.transition(PeerState::Releasing(class));

        let Some(mut ticket) = held.lease else {
            self.events
                .slot_vacated(self.local, class, VacateReason::Explicit);
            let released = self.pool(class).release().await.map_err(EngineError::from);
            self.tolerate_while_stopping(released)?;
            return Ok(());
        };

        if let ReleasePolicy::Leased {
            early_release: Some(delay),
            ..
        } = self.plan(class).policy
        {
            if !ticket.is_expired() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.stop.wait() => {}
                }
                ticket.expire_now();
            }
        }

        let outcome = ticket.outcome().await;
        if let Some(outcome) = self.tolerate_while_stopping(outcome)? {
            match outcome.reason {
                VacateReason::LeaseExpired => self.stats.leases_expired += 1,
                VacateReason::EarlyRelease => self.stats.early_releases += 1,
                VacateReason::Explicit | VacateReason::Shutdown => {}
            }
            tracing::debug!(
                peer = %self.local,
                %class,
                ts = held.timestamp,
                released = outcome.released,
                "lease settled"
            );
        }
        Ok(())
    }

    /// Send errors are expected once peers start shutting down
    fn tolerate_while_stopping<V>(
        &self,
        result: Result<V, EngineError>,
    ) -> Result<Option<V>, EngineError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if self.stop.is_stopped() => {
                tracing::warn!(peer = %self.local, error = %e, "send failed while stopping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
