// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-wide shared context: a namespaced mutable map actions use to
//! exchange data (`common/<key>`, `<protocol-name>/<key>`, …) plus the
//! diagnostic trigger queue.
//!
//! Reads default to a deep copy so one action cannot accidentally mutate
//! state another action is holding a reference to. A caller that genuinely
//! wants to share the stored value (not a copy of it) can opt into aliased
//! access, which hands back the same reference-counted value every caller
//! sees.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Namespaced job-wide mutable store plus the diagnostic trigger queue.
///
/// Single-threaded-cooperative use means at most one action mutates this at
/// a time, but the store is internally synchronized so it can be shared via
/// `Arc<Context>` without the engine having to thread `&mut` through the
/// whole action tree.
#[derive(Default)]
pub struct Context {
    data: Mutex<HashMap<String, HashMap<String, Arc<serde_json::Value>>>>,
    triggers: Mutex<VecDeque<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `namespace/key`, replacing any prior value.
    pub fn set_common_data(&self, namespace: &str, key: &str, value: serde_json::Value) {
        self.data
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), Arc::new(value));
    }

    /// Read the value stored under `namespace/key` as an independent deep
    /// copy, so mutating the result can never affect what other actions see.
    pub fn get_common_data(&self, namespace: &str, key: &str) -> Option<serde_json::Value> {
        self.data
            .lock()
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .map(|v| (**v).clone())
    }

    /// Read the value stored under `namespace/key` as a shared, aliased
    /// reference. Every caller that aliases the same key observes the same
    /// underlying allocation until the key is overwritten.
    pub fn get_common_data_aliased(
        &self,
        namespace: &str,
        key: &str,
    ) -> Option<Arc<serde_json::Value>> {
        self.data
            .lock()
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned()
    }

    /// Push a diagnostic complaint token onto the trigger queue.
    pub fn push_trigger(&self, token: impl Into<String>) {
        self.triggers.lock().push_back(token.into());
    }

    /// Drain and return every queued trigger token, oldest first.
    pub fn drain_triggers(&self) -> Vec<String> {
        self.triggers.lock().drain(..).collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
