// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publishing peer events.
//!
//! Every event is logged. When a channel is attached the event is also
//! forwarded, so an observer sharing one channel across peers sees a single
//! global trace.

use kex_core::{PeerEvent, PeerId, PeerState, ResourceClass, VacateReason};
use tokio::sync::mpsc;

/// Log and optionally forward peer events
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PeerEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that only logs
    pub fn log_only() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: PeerEvent) {
        match &event {
            PeerEvent::StateChanged { peer, from, to } => {
                tracing::info!(%peer, %from, %to, "state changed");
            }
            PeerEvent::SlotVacated {
                peer,
                class,
                reason,
            } => match reason {
                VacateReason::Explicit => tracing::debug!(%peer, %class, "slot released"),
                _ => tracing::info!(%peer, %class, ?reason, "slot vacated by lease"),
            },
            PeerEvent::RequestAbandoned { peer, class } => {
                tracing::info!(%peer, %class, "request abandoned");
            }
            PeerEvent::CycleCompleted { peer, cycle } => {
                tracing::debug!(%peer, cycle, "cycle completed");
            }
        }

        if let Some(tx) = &self.tx {
            // Observer gone; logging above is all that is left
            let _ = tx.send(event);
        }
    }

    pub fn state_changed(&self, peer: PeerId, from: PeerState, to: PeerState) {
        self.emit(PeerEvent::StateChanged { peer, from, to });
    }

    pub fn slot_vacated(&self, peer: PeerId, class: ResourceClass, reason: VacateReason) {
        self.emit(PeerEvent::SlotVacated {
            peer,
            class,
            reason,
        });
    }
}
