// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pod change notifications feeding the work queue.

use crate::error::{ControllerError, Result};
use crate::queue::WorkQueue;
use crate::selector::Selector;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use kube_runtime::watcher::Config as WatcherConfig;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Hook to adjust the list/watch options after the selector has been applied
pub type ListOptionsTweak = Arc<dyn Fn(&mut WatcherConfig) + Send + Sync>;

/// Source of change notifications for the controller.
///
/// Implementations deliver a full relist before reporting synced and push the
/// key of every relevant object into the queue.
pub trait Informer: Send + Sync + 'static {
    /// Begin delivering notifications in the background until `shutdown` fires.
    fn start(
        &self,
        selector: &Selector,
        queue: WorkQueue,
        shutdown: CancellationToken,
    ) -> Result<()>;

    fn has_synced(&self) -> bool;

    /// Wait for the initial list to be cached. Returns `false` if the stop
    /// signal fires or delivery ends first.
    fn wait_for_cache_sync(
        &self,
        shutdown: &CancellationToken,
    ) -> impl Future<Output = bool> + Send;
}

/// Cache key of an object, `namespace/name` or `name` for cluster-scoped objects
pub fn object_key(meta: &ObjectMeta) -> Result<String> {
    let name = meta
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ControllerError::InvalidKey("object has no name".to_string()))?;

    Ok(match meta.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => format!("{}/{}", ns, name),
        _ => name.to_string(),
    })
}

/// Split a cache key into namespace and name
pub fn split_key(key: &str) -> Result<(Option<&str>, &str)> {
    let mut parts = key.split('/');
    let parsed = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => (None, name),
        (Some(ns), Some(name), None) => (Some(ns), name),
        _ => return Err(ControllerError::InvalidKey(key.to_string())),
    };

    if parsed.1.is_empty() {
        return Err(ControllerError::InvalidKey(key.to_string()));
    }
    Ok(parsed)
}

/// Resolve a cache key against a pod store
pub fn lookup(store: &Store<Pod>, key: &str) -> Result<Option<Arc<Pod>>> {
    let (namespace, name) = split_key(key)?;
    let mut obj_ref = ObjectRef::<Pod>::new(name);
    if let Some(ns) = namespace {
        obj_ref = obj_ref.within(ns);
    }
    Ok(store.get(&obj_ref))
}

/// Pod informer backed by a kube-rs reflector store
pub struct PodInformer {
    client: Client,
    namespace: Option<String>,
    tweak: Option<ListOptionsTweak>,
    store: Store<Pod>,
    writer: Mutex<Option<reflector::store::Writer<Pod>>>,
    synced: Arc<AtomicBool>,
}

impl PodInformer {
    /// Informer for pods in `namespace`, or in all namespaces when `None`
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        let (store, writer) = reflector::store::<Pod>();
        Self {
            client,
            namespace,
            tweak: None,
            store,
            writer: Mutex::new(Some(writer)),
            synced: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_tweak(mut self, tweak: ListOptionsTweak) -> Self {
        self.tweak = Some(tweak);
        self
    }

    /// Read handle on the local pod cache
    pub fn store(&self) -> Store<Pod> {
        self.store.clone()
    }

    pub fn lookup(&self, key: &str) -> Result<Option<Arc<Pod>>> {
        lookup(&self.store, key)
    }

    fn watcher_config(&self, selector: &Selector) -> WatcherConfig {
        let mut config = WatcherConfig::default();
        if !selector.is_empty() {
            config = config.labels(&selector.to_string());
        }
        if let Some(tweak) = &self.tweak {
            tweak(&mut config);
        }
        config
    }

    fn api(&self) -> Api<Pod> {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

impl Informer for PodInformer {
    fn start(
        &self,
        selector: &Selector,
        queue: WorkQueue,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ControllerError::InformerAlreadyStarted)?;

        let config = self.watcher_config(selector);
        info!(
            "Starting pod informer: namespace={}, selector={}",
            self.namespace.as_deref().unwrap_or("<all>"),
            selector
        );

        let stream = watcher(self.api(), config).default_backoff().reflect(writer);
        let synced = Arc::clone(&self.synced);
        tokio::spawn(async move {
            futures::pin_mut!(stream);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = stream.next() => match event {
                        Some(Ok(event)) => handle_event(event, &queue, &synced),
                        Some(Err(e)) => warn!("Pod watch error: {}", e),
                        None => break,
                    },
                }
            }
            debug!("Pod informer stopped");
        });

        Ok(())
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    async fn wait_for_cache_sync(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            ready = self.store.wait_until_ready() => ready.is_ok(),
        }
    }
}

fn handle_event(event: watcher::Event<Pod>, queue: &WorkQueue, synced: &AtomicBool) {
    match event {
        watcher::Event::Apply(pod)
        | watcher::Event::InitApply(pod)
        | watcher::Event::Delete(pod) => match object_key(&pod.metadata) {
            Ok(key) => {
                queue.add(key);
            }
            Err(e) => warn!("Ignoring pod event: {}", e),
        },
        watcher::Event::Init => debug!("Pod relist started"),
        watcher::Event::InitDone => {
            synced.store(true, Ordering::SeqCst);
            debug!("Pod relist complete");
        }
    }
}
