// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leases that bound how long a slot may be held.
//!
//! A lease is armed when a slot is acquired. Its worker sleeps until the
//! deadline, an early-expiry request, or the stop signal, then vacates the
//! matching queue entry and broadcasts RELEASE. Workers are queued FIFO and
//! joined by a single cleanup task, so finished timers never pile up and
//! shutdown can wait for all of them.

use crate::error::EngineError;
use crate::events::EventSink;
use crate::pool::PoolController;
use crate::stop::StopSignal;
use kex_adapters::Transport;
use kex_core::{LamportTime, PeerId, ResourceClass, VacateReason};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Lifecycle of one lease
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseState {
    Running,
    ExpiredReleased,
}

/// One armed lease, shared by its worker and its ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaseTimer {
    pub owner: PeerId,
    pub class: ResourceClass,
    /// Timestamp of the acquisition this lease covers
    pub timestamp: LamportTime,
    pub deadline: Instant,
    pub state: LeaseState,
}

/// What a lease did when it fired
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaseOutcome {
    pub owner: PeerId,
    pub class: ResourceClass,
    pub timestamp: LamportTime,
    pub reason: VacateReason,
    /// `false` when the acquisition was already gone from the queue
    pub released: bool,
    /// Time from arming to firing
    pub held_for: Duration,
}

/// Handle to one lease's outcome
pub struct LeaseTicket {
    timer: Arc<Mutex<LeaseTimer>>,
    expire: Option<oneshot::Sender<()>>,
    outcome: oneshot::Receiver<Result<LeaseOutcome, EngineError>>,
}

impl LeaseTicket {
    pub fn timer(&self) -> LeaseTimer {
        *self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn deadline(&self) -> Instant {
        self.timer().deadline
    }

    /// Whether the worker has already vacated the slot
    pub fn is_expired(&self) -> bool {
        self.timer().state == LeaseState::ExpiredReleased
    }

    /// Ask the worker to fire now instead of at the deadline
    pub fn expire_now(&mut self) {
        if let Some(tx) = self.expire.take() {
            // Worker already finished if the receiver is gone
            let _ = tx.send(());
        }
    }

    /// Wait for the worker to fire
    pub async fn outcome(self) -> Result<LeaseOutcome, EngineError> {
        let owner = self.timer().owner;
        self.outcome
            .await
            .unwrap_or(Err(EngineError::LeaseLost(owner)))
    }
}

/// Arms leases for one pool of one peer and reaps their workers
pub struct LeaseManager<T> {
    pool: Arc<PoolController<T>>,
    events: EventSink,
    stop: StopSignal,
    workers: Option<mpsc::UnboundedSender<JoinHandle<()>>>,
    cleanup: Option<JoinHandle<usize>>,
    owner: PeerId,
}

impl<T: Transport> LeaseManager<T> {
    /// Must be called from within a Tokio runtime: spawns the cleanup task
    pub fn new(
        owner: PeerId,
        pool: Arc<PoolController<T>>,
        events: EventSink,
        stop: StopSignal,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cleanup = tokio::spawn(reap_workers(owner, rx));
        Self {
            pool,
            events,
            stop,
            workers: Some(tx),
            cleanup: Some(cleanup),
            owner,
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.pool.class()
    }

    /// Arm a lease over the acquisition stamped `timestamp`
    pub fn start_lease(
        &self,
        timestamp: LamportTime,
        timeout: Duration,
    ) -> Result<LeaseTicket, EngineError> {
        let workers = self
            .workers
            .as_ref()
            .ok_or(EngineError::LeaseClosed(self.owner))?;

        let armed_at = Instant::now();
        let timer = Arc::new(Mutex::new(LeaseTimer {
            owner: self.owner,
            class: self.pool.class(),
            timestamp,
            deadline: armed_at + timeout,
            state: LeaseState::Running,
        }));
        let (expire_tx, expire_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let worker = LeaseWorker {
            pool: Arc::clone(&self.pool),
            events: self.events.clone(),
            stop: self.stop.clone(),
            timer: Arc::clone(&timer),
            armed_at,
        };
        let handle = tokio::spawn(worker.run(expire_rx, outcome_tx));
        workers
            .send(handle)
            .map_err(|_| EngineError::LeaseClosed(self.owner))?;

        tracing::debug!(
            peer = %self.owner,
            class = %self.pool.class(),
            ts = timestamp,
            timeout_ms = timeout.as_millis() as u64,
            "lease armed"
        );

        Ok(LeaseTicket {
            timer,
            expire: Some(expire_tx),
            outcome: outcome_rx,
        })
    }

    /// Stop accepting leases and wait until every worker has been reaped.
    /// Returns the number of workers reaped over the manager's lifetime.
    pub async fn shutdown(mut self) -> usize {
        self.workers.take();
        match self.cleanup.take() {
            Some(cleanup) => match cleanup.await {
                Ok(reaped) => reaped,
                Err(e) => {
                    tracing::warn!(peer = %self.owner, error = %e, "lease cleanup task failed");
                    0
                }
            },
            None => 0,
        }
    }
}

struct LeaseWorker<T> {
    pool: Arc<PoolController<T>>,
    events: EventSink,
    stop: StopSignal,
    timer: Arc<Mutex<LeaseTimer>>,
    armed_at: Instant,
}

impl<T: Transport> LeaseWorker<T> {
    async fn run(
        self,
        mut expire: oneshot::Receiver<()>,
        outcome_tx: oneshot::Sender<Result<LeaseOutcome, EngineError>>,
    ) {
        let armed = *self.timer.lock().unwrap_or_else(|e| e.into_inner());

        let reason = tokio::select! {
            _ = tokio::time::sleep_until(armed.deadline) => VacateReason::LeaseExpired,
            Ok(()) = &mut expire => VacateReason::EarlyRelease,
            _ = self.stop.wait() => VacateReason::Shutdown,
        };

        let result = self.fire(armed, reason).await;
        self.timer.lock().unwrap_or_else(|e| e.into_inner()).state = LeaseState::ExpiredReleased;

        match &result {
            Err(e) if self.stop.is_stopped() => {
                tracing::warn!(peer = %armed.owner, class = %armed.class, error = %e, "lease release failed during shutdown")
            }
            Err(e) => {
                tracing::error!(peer = %armed.owner, class = %armed.class, error = %e, "lease release failed")
            }
            Ok(_) => {}
        }
        // Ticket dropped: nobody is waiting for the outcome
        let _ = outcome_tx.send(result);
    }

    async fn fire(&self, armed: LeaseTimer, reason: VacateReason) -> Result<LeaseOutcome, EngineError> {
        let held_for = self.armed_at.elapsed();
        let released = self.pool.vacate(armed.timestamp);
        if released {
            // Published before the RELEASE leaves, so observers never see
            // the next holder ahead of this vacate
            self.events.slot_vacated(armed.owner, armed.class, reason);
            self.pool.announce_release().await?;
            tracing::info!(
                peer = %armed.owner,
                class = %armed.class,
                ts = armed.timestamp,
                ?reason,
                held_ms = held_for.as_millis() as u64,
                "lease fired"
            );
        } else {
            tracing::debug!(peer = %armed.owner, class = %armed.class, ts = armed.timestamp, "lease fired on a released slot");
        }

        Ok(LeaseOutcome {
            owner: armed.owner,
            class: armed.class,
            timestamp: armed.timestamp,
            reason,
            released,
            held_for,
        })
    }
}

/// Join workers in spawn order until the queue closes
async fn reap_workers(owner: PeerId, mut workers: mpsc::UnboundedReceiver<JoinHandle<()>>) -> usize {
    let mut reaped = 0;
    while let Some(worker) = workers.recv().await {
        if let Err(e) = worker.await {
            tracing::warn!(peer = %owner, error = %e, "lease worker panicked");
        }
        reaped += 1;
        tracing::trace!(peer = %owner, reaped, "lease worker reaped");
    }
    reaped
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
