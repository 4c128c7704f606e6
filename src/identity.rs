// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Identity of the pod hosting this controller.

use crate::constants::SERVICE_ACCOUNT_NAMESPACE_PATH;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

/// Namespace and name of the pod running the controller. The heartbeat
/// requeues this key so the handler runs even when no pod events arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerIdentity {
    pub namespace: String,
    pub pod_name: String,
}

impl ControllerIdentity {
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
        }
    }

    /// Resolve the identity from `POD_NAME` and the pod's namespace
    pub fn from_env() -> Result<Self> {
        let pod_name = env::var("POD_NAME").context("POD_NAME environment variable not set")?;
        let namespace = resolve_namespace(
            env::var("POD_NAMESPACE").ok(),
            Path::new(SERVICE_ACCOUNT_NAMESPACE_PATH),
        );
        Ok(Self::new(namespace, pod_name))
    }

    /// Work queue key of the controller's own pod
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.pod_name)
    }
}

/// `POD_NAMESPACE` wins, then the mounted service account namespace, then `default`
fn resolve_namespace(from_env: Option<String>, service_account_file: &Path) -> String {
    if let Some(ns) = from_env.filter(|ns| !ns.is_empty()) {
        return ns;
    }
    fs::read_to_string(service_account_file)
        .ok()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| "default".to_string())
}
