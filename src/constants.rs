// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Well-known label keys used to select the pods of a database instance
pub mod labels {
    /// Fully-qualified resource name of the owning database
    pub const NAME: &str = "app.kubernetes.io/name";
    /// Name of the owning database instance
    pub const INSTANCE: &str = "app.kubernetes.io/instance";
    /// Operator group that manages the pod
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// API group of the database operator, used as the managed-by label value
pub const GROUP_NAME: &str = "kubedb.com";

/// Worker name used in logs
pub const POD_WORKER_NAME: &str = "pod";

/// Controller defaults, overridable from the environment
pub mod defaults {
    pub const MAX_NUM_REQUEUES: u32 = 5;
    pub const NUM_THREADS: usize = 2;
    /// Interval between heartbeat requeues of the controller's own pod
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;
    /// How long the binary waits for workers to drain after a stop signal
    pub const SHUTDOWN_GRACE_SECS: u64 = 30;
}

/// Work queue retry backoff
pub mod backoff {
    pub const BASE_DELAY_MS: u64 = 5;
    pub const MAX_DELAY_SECS: u64 = 1000;
}

/// Service account mount that holds the namespace of the running pod
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
