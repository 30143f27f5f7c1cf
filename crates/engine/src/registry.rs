// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Registry`]: strategy selection mapping `(action-kind, parameters,
//! device)` to a concrete [`Action`] instance (§4.6).
//!
//! Registration happens once at startup into an explicit keyed table, not by
//! walking subclasses at runtime — see the REDESIGN FLAGS entry on strategy
//! selection.

use crate::action::Action;
use rigpipe_core::EngineError;
use std::collections::HashMap;

/// A factory for one concrete [`Action`] implementation, plus the predicate
/// that decides whether it applies to a given device and parameter block.
pub trait Strategy: Send + Sync {
    /// Higher values are preferred when more than one registered strategy
    /// under the same kind accepts the same `(device, params)` pair.
    fn compatibility(&self) -> i32;

    /// The section tag this strategy's actions report via `Action::section`.
    fn action_type(&self) -> &str;

    /// Pure predicate: must not perform I/O.
    fn accepts(&self, device: &serde_json::Value, params: &serde_json::Value) -> bool;

    /// Build a fresh instance of the action this strategy selects.
    fn instantiate(&self) -> Box<dyn Action>;
}

/// A keyed table of [`Strategy`] implementations, consulted by the tree
/// builder once per action description.
#[derive(Default)]
pub struct Registry {
    strategies: HashMap<String, Vec<Box<dyn Strategy>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register `strategy` under `kind`. Later registrations under the same
    /// kind are only consulted after earlier ones of equal compatibility;
    /// `select` breaks ties by registration order.
    pub fn register(&mut self, kind: impl Into<String>, strategy: Box<dyn Strategy>) {
        self.strategies.entry(kind.into()).or_default().push(strategy);
    }

    /// The first strategy registered under `kind`, sorted by descending
    /// `compatibility`, whose `accepts` returns true. No match is a
    /// [`EngineError::Job`] (a job description naming an unimplemented or
    /// unreachable action kind is the user's mistake, not the engine's).
    pub fn select(
        &self,
        kind: &str,
        device: &serde_json::Value,
        params: &serde_json::Value,
    ) -> Result<Box<dyn Action>, EngineError> {
        let Some(candidates) = self.strategies.get(kind) else {
            return Err(EngineError::Job(format!(
                "no strategy registered for action kind '{kind}'"
            )));
        };

        let mut ranked: Vec<&Box<dyn Strategy>> = candidates.iter().collect();
        ranked.sort_by_key(|s| std::cmp::Reverse(s.compatibility()));

        ranked
            .into_iter()
            .find(|s| s.accepts(device, params))
            .map(|s| s.instantiate())
            .ok_or_else(|| {
                EngineError::Job(format!(
                    "no strategy registered under '{kind}' accepts this device and parameters"
                ))
            })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
