// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pool of workers draining the work queue into a [`Reconcile`] handler.

use crate::error::ControllerError;
use crate::queue::WorkQueue;
use crate::reconcilers::Reconcile;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Worker<H> {
    name: String,
    queue: WorkQueue,
    handler: Arc<H>,
    max_retries: u32,
    threads: usize,
}

/// Handles of the tasks started by [`Worker::run`]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Wait for every worker to exit
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
    }
}

impl<H: Reconcile> Worker<H> {
    pub fn new(
        name: impl Into<String>,
        queue: WorkQueue,
        handler: H,
        max_retries: u32,
        threads: usize,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            handler: Arc::new(handler),
            max_retries,
            threads: threads.max(1),
        }
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Spawn the workers and return immediately. Once `shutdown` fires the
    /// queue stops admitting keys; workers finish the keys still queued and exit.
    pub fn run(&self, shutdown: CancellationToken) -> WorkerPool {
        info!("Starting {} {} workers", self.threads, self.name);
        let mut handles = Vec::with_capacity(self.threads + 1);

        let queue = self.queue.clone();
        let name = self.name.clone();
        handles.push(tokio::spawn(async move {
            shutdown.cancelled().await;
            info!("Shutting down {} queue", name);
            queue.shut_down();
        }));

        for id in 0..self.threads {
            let queue = self.queue.clone();
            let handler = Arc::clone(&self.handler);
            let name = self.name.clone();
            let max_retries = self.max_retries;
            handles.push(tokio::spawn(async move {
                while let Some(key) = queue.get().await {
                    process_next(&queue, handler.as_ref(), &key, max_retries).await;
                    queue.done(&key);
                }
                debug!("{} worker {} stopped", name, id);
            }));
        }

        WorkerPool { handles }
    }
}

async fn process_next<H: Reconcile>(queue: &WorkQueue, handler: &H, key: &str, max_retries: u32) {
    // A panicking handler counts as a failed attempt; the key must still reach done()
    let result = match AssertUnwindSafe(handler.reconcile(key)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!("Handler panicked while processing key {}", key);
            Err(ControllerError::ReconcileError(format!(
                "handler panicked on {}",
                key
            )))
        }
    };

    match result {
        Ok(()) => queue.forget(key),
        Err(e) => {
            let attempts = queue.num_requeues(key);
            if attempts < max_retries {
                warn!(
                    "Failed to process key {} (retry {}/{}): {}",
                    key,
                    attempts + 1,
                    max_retries,
                    e
                );
                queue.add_rate_limited(key);
            } else {
                queue.forget(key);
                error!(
                    "Dropping key {} out of the queue after {} retries: {}",
                    key, attempts, e
                );
            }
        }
    }
}
