// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Log Retention
//!
//! Background task that drops transaction logs older than a slot window.
//! Records and address history survive; only the bulk log payload goes.
//! Any record whose fragments fall outside the window can no longer be
//! reconstructed, exactly as on a ledger with bounded log retention.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::Ledger;

/// Periodic log pruner.
pub struct LogRetention {
    ledger: Arc<Ledger>,
    retain_slots: u64,
    interval: Duration,
}

impl LogRetention {
    pub fn new(ledger: Arc<Ledger>, retain_slots: u64, interval: Duration) -> Self {
        Self {
            ledger,
            retain_slots,
            interval,
        }
    }

    /// Run one pruning pass.
    pub fn prune_once(&self) -> usize {
        match self.ledger.prune_logs(self.retain_slots) {
            Ok(pruned) => pruned,
            Err(e) => {
                tracing::warn!(error = %e, "Log pruning failed, will retry");
                0
            }
        }
    }

    /// Run the pruning loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(retention.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            retain_slots = self.retain_slots,
            interval_secs = self.interval.as_secs(),
            "Log retention starting"
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Log retention shutting down");
                return;
            }

            self.prune_once();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("Log retention shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::*;

    #[tokio::test]
    async fn run_prunes_then_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(&dir.path().join("ledger.redb")).unwrap());
        let owner_key = key(1);
        let owner = authority_of(&owner_key);

        let created = ledger
            .submit(&signed(&owner_key, &owner, "img", create("img", 1)))
            .unwrap();
        ledger
            .submit(&signed(&owner_key, &owner, "img", append(0, b"z")))
            .unwrap();

        let shutdown = CancellationToken::new();
        let retention = LogRetention::new(ledger.clone(), 1, Duration::from_secs(3600));
        let handle = tokio::spawn(retention.run(shutdown.clone()));

        // First pass runs immediately on start.
        for _ in 0..50 {
            if ledger.transaction(&created.op_id).unwrap().unwrap().logs.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ledger.transaction(&created.op_id).unwrap().unwrap().logs.is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn zero_window_prunes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(&dir.path().join("ledger.redb")).unwrap());
        let owner_key = key(3);
        let owner = authority_of(&owner_key);
        ledger
            .submit(&signed(&owner_key, &owner, "gone", create("gone", 1)))
            .unwrap();

        let retention = LogRetention::new(ledger, 0, Duration::from_secs(1));
        assert_eq!(retention.prune_once(), 1);
        assert_eq!(retention.prune_once(), 0);
    }
}
