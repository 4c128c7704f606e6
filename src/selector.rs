// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Equality-based label selector scoping the watch to one database instance.

use crate::constants::{labels, GROUP_NAME};
use std::collections::BTreeMap;
use std::fmt;

/// Set of required label pairs. A label set matches when it carries every pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    requirements: BTreeMap<String, String>,
}

impl Selector {
    pub fn from_set<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            requirements: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Selector for the pods that belong to a database instance
    pub fn for_database(db_name: &str, db_fqn: &str) -> Self {
        Self::from_set([
            (labels::NAME, db_fqn),
            (labels::INSTANCE, db_name),
            (labels::MANAGED_BY, GROUP_NAME),
        ])
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Renders the `labelSelector` query form, `k1=v1,k2=v2`
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}
