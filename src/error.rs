// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("{0} timed out waiting for caches to sync")]
    CacheSync(String),

    #[error("Invalid item key: {0}")]
    InvalidKey(String),

    #[error("Informer already started")]
    InformerAlreadyStarted,

    #[error("Reconcile failed: {0}")]
    ReconcileError(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
