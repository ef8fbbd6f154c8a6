// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster-wide stop signal

use std::sync::Arc;
use tokio::sync::watch;

/// Idempotent stop flag that can be polled or awaited
#[derive(Clone, Debug)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag. Returns `true` only for the call that raised it.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the flag is raised
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn trigger_is_idempotent() {
        let stop = StopSignal::new();
        assert!(!stop.is_stopped());

        assert!(stop.trigger());
        assert!(!stop.trigger());
        assert!(stop.is_stopped());
    }

    #[tokio::test]
    async fn wait_resolves_for_every_clone() {
        let stop = StopSignal::new();
        let waiter = stop.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        stop.trigger();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        // Already raised: returns immediately
        stop.wait().await;
    }
}
