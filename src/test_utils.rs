// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API, a fake informer and recording handlers.

use crate::error::{ControllerError, Result};
use crate::informer::Informer;
use crate::queue::WorkQueue;
use crate::reconcilers::Reconcile;
use crate::selector::Selector;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Pod;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<
            dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>>
                + Send,
        >,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json()));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json() -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a pod with the given labels
pub fn make_pod(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Create a mock PodList JSON response
pub fn pod_list_json(pods: &[Pod]) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "PodList",
        "metadata": { "resourceVersion": "1" },
        "items": pods,
    })
    .to_string()
}

/// Informer that pushes a fixed set of keys and optionally never syncs
pub struct FakeInformer {
    keys: Vec<String>,
    syncs: bool,
    started: AtomicBool,
}

impl FakeInformer {
    pub fn synced(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            syncs: true,
            started: AtomicBool::new(false),
        }
    }

    pub fn never_synced(keys: &[&str]) -> Self {
        Self {
            syncs: false,
            ..Self::synced(keys)
        }
    }
}

impl Informer for FakeInformer {
    fn start(
        &self,
        _selector: &Selector,
        queue: WorkQueue,
        _shutdown: CancellationToken,
    ) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ControllerError::InformerAlreadyStarted);
        }
        for key in &self.keys {
            queue.add(key.clone());
        }
        Ok(())
    }

    fn has_synced(&self) -> bool {
        self.syncs && self.started.load(Ordering::SeqCst)
    }

    async fn wait_for_cache_sync(&self, shutdown: &CancellationToken) -> bool {
        if self.has_synced() {
            return true;
        }
        shutdown.cancelled().await;
        false
    }
}

/// One handler invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub key: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Handler that records every call, sleeping `delay` and failing if asked to
#[derive(Default)]
pub struct RecordingReconciler {
    calls: Mutex<Vec<Invocation>>,
    delay: Duration,
    fail: bool,
    panic_once: AtomicBool,
}

impl RecordingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Panics on the first call, succeeds afterwards
    pub fn panicking_once() -> Self {
        Self {
            panic_once: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls().iter().filter(|c| c.key == key).count()
    }
}

impl Reconcile for RecordingReconciler {
    async fn reconcile(&self, key: &str) -> Result<()> {
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("reconcile of {} panicked", key);
        }
        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap().push(Invocation {
            key: key.to_string(),
            started,
            finished: Instant::now(),
        });

        if self.fail {
            return Err(ControllerError::ReconcileError(format!("{} failed", key)));
        }
        Ok(())
    }
}

impl<R: Reconcile> Reconcile for Arc<R> {
    fn reconcile(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send {
        (**self).reconcile(key)
    }
}
