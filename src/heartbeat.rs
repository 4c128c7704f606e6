// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Periodic requeue of the controller's own pod.

use crate::queue::WorkQueue;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Adds `key` to the queue every `period` until stopped, whatever the backlog.
pub struct Heartbeat {
    queue: WorkQueue,
    key: String,
    period: Duration,
}

impl Heartbeat {
    pub fn new(queue: WorkQueue, key: String, period: Duration) -> Self {
        Self { queue, key, period }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// The first requeue happens one full period after start.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.queue.add(self.key.clone()) {
                        warn!("Failed to requeue pod {}. Reason: queue is shutting down", self.key);
                    }
                }
            }
        }
        debug!("Heartbeat for {} stopped", self.key);
    }
}
