// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Default pod handler: resolves keys against the informer cache.

use crate::error::Result;
use crate::informer::lookup;
use crate::reconcilers::Reconcile;
use crate::selector::Selector;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::Store;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

pub struct PodReconciler {
    store: Store<Pod>,
    selector: Selector,
    heartbeat_key: String,
}

impl PodReconciler {
    pub fn new(store: Store<Pod>, selector: Selector, heartbeat_key: String) -> Self {
        Self {
            store,
            selector,
            heartbeat_key,
        }
    }

    /// Full pass over every cached pod of the database
    fn resync(&self) -> usize {
        let pods = self.store.state();
        let managed = pods
            .iter()
            .filter(|pod| self.selector.matches(pod.labels()))
            .count();
        info!("Heartbeat: {} managed pods in cache", managed);
        managed
    }
}

impl Reconcile for PodReconciler {
    #[instrument(skip(self))]
    async fn reconcile(&self, key: &str) -> Result<()> {
        if key == self.heartbeat_key {
            self.resync();
            return Ok(());
        }

        match lookup(&self.store, key)? {
            Some(pod) if self.selector.matches(pod.labels()) => {
                debug!("Pod {} is managed, phase={:?}", key, pod_phase(&pod));
            }
            Some(_) => debug!("Pod {} no longer matches the selector", key),
            None => debug!("Pod {} has been deleted", key),
        }
        Ok(())
    }
}

fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::test_utils::make_pod;
    use kube::runtime::reflector;
    use kube::runtime::watcher::Event;

    fn selector() -> Selector {
        Selector::from_set([("app", "pg")])
    }

    fn store_with(pods: Vec<Pod>) -> Store<Pod> {
        let (store, mut writer) = reflector::store::<Pod>();
        writer.apply_watcher_event(&Event::Init);
        for pod in pods {
            writer.apply_watcher_event(&Event::InitApply(pod));
        }
        writer.apply_watcher_event(&Event::InitDone);
        store
    }

    #[test]
    fn test_resync_counts_only_managed_pods() {
        let store = store_with(vec![
            make_pod("demo", "pg-0", &[("app", "pg")]),
            make_pod("demo", "pg-1", &[("app", "pg")]),
            make_pod("demo", "web-0", &[("app", "web")]),
        ]);
        let reconciler = PodReconciler::new(store, selector(), "demo/labeler-0".to_string());

        assert_eq!(reconciler.resync(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_known_and_missing_pods() {
        let store = store_with(vec![make_pod("demo", "pg-0", &[("app", "pg")])]);
        let reconciler = PodReconciler::new(store, selector(), "demo/labeler-0".to_string());

        assert!(reconciler.reconcile("demo/pg-0").await.is_ok());
        assert!(reconciler.reconcile("demo/gone").await.is_ok());
        assert!(reconciler.reconcile("demo/labeler-0").await.is_ok());
    }

    #[tokio::test]
    async fn test_reconcile_rejects_malformed_key() {
        let reconciler =
            PodReconciler::new(store_with(vec![]), selector(), "demo/labeler-0".to_string());

        let result = reconciler.reconcile("a/b/c").await;

        assert!(matches!(result, Err(ControllerError::InvalidKey(_))));
    }
}
