// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating work queue of `namespace/name` keys with per-key retry backoff.
//!
//! A key is in at most one of the queued and processing sets. Adding a key that
//! is being processed marks it dirty; it is queued again once [`WorkQueue::done`]
//! is called for it, so no two consumers ever hold the same key at once.

use crate::constants::backoff::{BASE_DELAY_MS, MAX_DELAY_SECS};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cloneable handle to a shared work queue
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    notify: Notify,
    backoff: ItemBackoff,
    /// Cancels pending delayed adds on shutdown
    shutdown: CancellationToken,
}

#[derive(Default)]
struct State {
    queue: VecDeque<String>,
    /// Keys waiting to be processed, queued or deferred behind processing
    dirty: HashSet<String>,
    processing: HashSet<String>,
    failures: HashMap<String, u32>,
    shutting_down: bool,
}

/// Per-key exponential backoff: `base * 2^(failures - 1)`, capped at `max`
#[derive(Debug, Clone, Copy)]
pub struct ItemBackoff {
    base: Duration,
    max: Duration,
}

impl ItemBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for ItemBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BASE_DELAY_MS),
            Duration::from_secs(MAX_DELAY_SECS),
        )
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::with_backoff(ItemBackoff::default())
    }

    pub fn with_backoff(backoff: ItemBackoff) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                backoff,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a key. Returns `false` only when the queue is shutting down;
    /// adding a key that is already pending is a no-op.
    pub fn add(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        let mut state = self.lock();
        if state.shutting_down {
            return false;
        }
        if !state.dirty.insert(key.clone()) {
            return true;
        }
        if state.processing.contains(&key) {
            // Requeued by done()
            return true;
        }
        state.queue.push_back(key);
        drop(state);

        self.inner.notify.notify_one();
        true
    }

    /// Wait for the next key. Returns `None` once the queue is shut down and drained.
    pub async fn get(&self) -> Option<String> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Mark a key as processed, requeueing it if it was added in the meantime.
    pub fn done(&self, key: &str) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.to_string());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Record a failure for the key and add it back after its backoff delay.
    pub fn add_rate_limited(&self, key: &str) {
        let delay = {
            let mut state = self.lock();
            if state.shutting_down {
                return;
            }
            let failures = state.failures.entry(key.to_string()).or_insert(0);
            *failures += 1;
            self.inner.backoff.delay(*failures)
        };

        debug!("Requeueing {} in {:?}", key, delay);
        let queue = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = queue.inner.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    queue.add(key);
                }
            }
        });
    }

    /// Clear the failure history of a key
    pub fn forget(&self, key: &str) {
        self.lock().failures.remove(key);
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.lock().failures.get(key).copied().unwrap_or(0)
    }

    /// Number of keys waiting to be handed out
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop admitting keys and wake every waiting consumer.
    /// Keys already queued are still handed out by [`WorkQueue::get`].
    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.inner.shutdown.cancel();
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}
