// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Controller configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the owning database instance
    pub db_name: String,
    /// Fully-qualified resource name of the owning database
    pub db_fqn: String,
    /// Namespace to watch, `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Attempts after the first failure before an item is dropped
    pub max_num_requeues: u32,
    pub num_threads: usize,
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Configuration with default tunables for the given database
    pub fn new(db_name: impl Into<String>, db_fqn: impl Into<String>) -> Self {
        Config {
            db_name: db_name.into(),
            db_fqn: db_fqn.into(),
            watch_namespace: None,
            max_num_requeues: defaults::MAX_NUM_REQUEUES,
            num_threads: defaults::NUM_THREADS,
            heartbeat_interval: Duration::from_secs(defaults::HEARTBEAT_INTERVAL_SECS),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_name = lookup("DB_NAME").context("DB_NAME environment variable not set")?;
        let db_fqn = lookup("DB_FQN").context("DB_FQN environment variable not set")?;

        let mut config = Config::new(db_name, db_fqn);
        config.watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());
        config.max_num_requeues = parse_or(&lookup, "MAX_NUM_REQUEUES", config.max_num_requeues)?;
        config.num_threads = parse_or(&lookup, "NUM_THREADS", config.num_threads)?;

        let heartbeat_secs = parse_or(
            &lookup,
            "HEARTBEAT_INTERVAL_SECS",
            defaults::HEARTBEAT_INTERVAL_SECS,
        )?;
        config.heartbeat_interval = Duration::from_secs(heartbeat_secs);

        if config.num_threads == 0 {
            bail!("NUM_THREADS must be greater than zero");
        }
        if config.heartbeat_interval.is_zero() {
            bail!("HEARTBEAT_INTERVAL_SECS must be greater than zero");
        }

        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        None => Ok(default),
    }
}
