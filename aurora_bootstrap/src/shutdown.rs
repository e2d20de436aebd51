// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! A clone-able [`ShutdownToken`] that pipeline code checks at suspension
//! points, plus a coordinator that ties it to Ctrl-C. Cancellation is
//! monotonic: once cancelled, a token never resets, and every waiter is
//! woken exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::info;

/// Cancellation token for signaling shutdown across tasks.
#[derive(Clone, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels this token and wakes all waiters.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Non-blocking cancellation check.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves when the token is cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Owns the token and the signal listener.
pub struct ShutdownCoordinator {
    token: ShutdownToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: ShutdownToken::new(),
        }
    }

    pub fn token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// Spawns the Ctrl-C listener; the first signal cancels the token.
    pub fn listen_for_signals(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received; finishing the current step");
                token.cancel();
            }
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
