// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in strategies for the control constructs this crate itself defines
//! ("retry", "finalize"), as distinct from concrete validation strategies
//! (boot-fastboot, uefi-menu, …) which remain an external collaborator's
//! responsibility (§1). An embedding application registers those on top of
//! [`register_builtins`].

use crate::action::{Action, ActionState};
use crate::connection::ConnectionHandle;
use crate::job::Job;
use crate::registry::{Registry, Strategy};
use crate::retry_action::RetryAction;
use async_trait::async_trait;
use rigpipe_core::EngineError;

/// The mandatory terminal root-level action (§8, §3 GLOSSARY: "Finalize").
/// Drops whatever connection it is handed; idempotent with respect to
/// teardown since it performs no I/O of its own.
pub struct FinalizeAction {
    state: ActionState,
}

impl FinalizeAction {
    pub fn new() -> Self {
        Self {
            state: ActionState::new("finalize"),
        }
    }
}

impl Default for FinalizeAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for FinalizeAction {
    fn name(&self) -> &'static str {
        "finalize"
    }
    fn summary(&self) -> &str {
        "closes the connection and leaves the device under test idle"
    }
    fn description(&self) -> &str {
        "closes the connection and leaves the device under test idle"
    }
    fn section(&self) -> &str {
        "finalize"
    }
    fn state(&self) -> &ActionState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    async fn run(
        &mut self,
        connection: Option<ConnectionHandle>,
        _job: &Job,
    ) -> Result<Option<ConnectionHandle>, EngineError> {
        if connection.is_some() {
            tracing::info!("finalize: releasing connection");
        }
        Ok(None)
    }
}

struct FinalizeStrategy;

impl Strategy for FinalizeStrategy {
    fn compatibility(&self) -> i32 {
        0
    }
    fn action_type(&self) -> &str {
        "finalize"
    }
    fn accepts(&self, _device: &serde_json::Value, _params: &serde_json::Value) -> bool {
        true
    }
    fn instantiate(&self) -> Box<dyn Action> {
        Box::new(FinalizeAction::new())
    }
}

struct RetryStrategy;

impl Strategy for RetryStrategy {
    fn compatibility(&self) -> i32 {
        0
    }
    fn action_type(&self) -> &str {
        "control"
    }
    fn accepts(&self, _device: &serde_json::Value, _params: &serde_json::Value) -> bool {
        true
    }
    fn instantiate(&self) -> Box<dyn Action> {
        Box::new(RetryAction::new())
    }
}

/// Register the "finalize" and "retry" control constructs this crate
/// itself owns. Concrete phase strategies (boot, deploy, test, …) are an
/// embedding application's responsibility to register on top of this.
pub fn register_builtins(registry: &mut Registry) {
    registry.register("finalize", Box::new(FinalizeStrategy));
    registry.register("retry", Box::new(RetryStrategy));
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
