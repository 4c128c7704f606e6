// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Label controller: wires the informer, work queue, workers and heartbeat
//! together and sequences their startup and shutdown.

use crate::config::Config;
use crate::constants::POD_WORKER_NAME;
use crate::error::{ControllerError, Result};
use crate::heartbeat::Heartbeat;
use crate::identity::ControllerIdentity;
use crate::informer::Informer;
use crate::queue::WorkQueue;
use crate::reconcilers::Reconcile;
use crate::selector::Selector;
use crate::worker::{Worker, WorkerPool};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

pub struct LabelController<I, H> {
    config: Config,
    identity: ControllerIdentity,
    selector: Selector,
    informer: I,
    worker: Worker<H>,
}

/// Background activity of a started controller
pub struct RunningController {
    workers: WorkerPool,
    heartbeat: JoinHandle<()>,
}

impl RunningController {
    /// Wait up to `grace` for the workers and heartbeat to exit after the
    /// stop signal. Returns `false` if they were still running.
    pub async fn wait(self, grace: Duration) -> bool {
        let heartbeat = self.heartbeat;
        let drained = tokio::time::timeout(grace, async move {
            self.workers.join().await;
            if let Err(e) = heartbeat.await {
                error!("Heartbeat task failed: {}", e);
            }
        })
        .await;
        drained.is_ok()
    }
}

impl<I: Informer, H: Reconcile> LabelController<I, H> {
    /// Build the controller. The selector is derived from the owning database
    /// and handed to `make_handler`, so the handler and the watch agree on scope.
    pub fn new(
        config: Config,
        identity: ControllerIdentity,
        informer: I,
        make_handler: impl FnOnce(&Selector) -> H,
    ) -> Self {
        let selector = Selector::for_database(&config.db_name, &config.db_fqn);
        let worker = Worker::new(
            POD_WORKER_NAME,
            WorkQueue::new(),
            make_handler(&selector),
            config.max_num_requeues,
            config.num_threads,
        );

        Self {
            config,
            identity,
            selector,
            informer,
            worker,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn queue(&self) -> &WorkQueue {
        self.worker.queue()
    }

    /// Start the informer, wait for its cache, then start the workers and the
    /// heartbeat. Returns once everything runs in the background.
    ///
    /// Fails with [`ControllerError::CacheSync`] if the cache does not sync
    /// before `shutdown` fires; no worker has read from the queue in that case.
    #[instrument(skip_all, fields(db = %self.config.db_name))]
    pub async fn start(&self, shutdown: CancellationToken) -> Result<RunningController> {
        let queue = self.queue().clone();
        self.informer.start(&self.selector, queue.clone(), shutdown.clone())?;

        info!("Waiting for pod cache to sync");
        if !self.informer.wait_for_cache_sync(&shutdown).await {
            error!("Pod informer timed out waiting for caches to sync");
            queue.shut_down();
            return Err(ControllerError::CacheSync(POD_WORKER_NAME.to_string()));
        }
        info!("Pod cache synced");

        let workers = self.worker.run(shutdown.clone());
        let heartbeat = Heartbeat::new(queue, self.identity.key(), self.config.heartbeat_interval)
            .spawn(shutdown);

        Ok(RunningController { workers, heartbeat })
    }

    /// Start the controller and block until `shutdown` fires. The returned
    /// handle can be used to wait for the background tasks to drain.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<RunningController> {
        let running = self.start(shutdown.clone()).await?;
        shutdown.cancelled().await;
        info!("Stop signal received, label controller shutting down");
        self.queue().shut_down();
        Ok(running)
    }
}
