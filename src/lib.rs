// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod informer;
pub mod queue;
pub mod reconcilers;
pub mod selector;
pub mod worker;

#[cfg(test)]
mod test_utils;
