// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Handlers invoked by the worker pool for each dequeued key.

pub mod pod;

pub use pod::PodReconciler;

use crate::error::Result;
use std::future::Future;

/// Processes one work queue key. An error sends the key back through the
/// queue's retry backoff.
pub trait Reconcile: Send + Sync + 'static {
    fn reconcile(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
