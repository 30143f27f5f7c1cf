// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative cancellation shared between the executor's signal listener
//! and every pipeline level, instead of a process-wide alarm signal (§9).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cheaply-cloned handle; every clone observes the same cancellation.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this token cancelled and wake every waiter. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled; resolves immediately if already cancelled.
    ///
    /// `notified()` is called before the flag check (not after) so that a
    /// `cancel()` landing between the check and the await is still observed:
    /// `Notify` snapshots its generation when the future is created, not
    /// when it is first polled, so a `notify_waiters()` call anywhere after
    /// that point still wakes this waiter instead of being silently missed.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
#[path = "cancellation_tests.rs"]
mod tests;
