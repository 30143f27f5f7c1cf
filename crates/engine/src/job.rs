// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Job`]: the device descriptor, the job-global timeout, the shared
//! [`Context`], protocol and diagnostic registries, and the cancellation
//! token — everything a running action tree needs besides its own actions.
//!
//! The root [`crate::pipeline::Pipeline`] is deliberately NOT a field of
//! `Job`: `Action::run` takes `job: &Job` by shared reference while the
//! pipeline driving it needs a mutable borrow of its own action list at the
//! same time, which a single owning struct cannot express without interior
//! mutability over the whole tree. The executor holds `Job` and the root
//! pipeline as sibling values with the same lifetime instead; see
//! `DESIGN.md` for the write-up of this deviation from §3's literal
//! `Pipeline: { parent, job, actions, branch_level }`.

use crate::action::Action;
use crate::cancellation::CancelToken;
use crate::connection::Protocol;
use parking_lot::Mutex;
use rigpipe_core::{Context, EngineError, Timeout, TimeoutSource, TimeoutSpec};
use std::collections::HashMap;

use crate::connection::ConnectionHandle;

/// Which per-name override table a timeout name is looked up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutKind {
    Action,
    Connection,
}

/// Everything a running action tree shares, besides the tree itself.
pub struct Job {
    pub device: serde_json::Value,
    pub timeout: Timeout,
    context: Context,
    cancel: CancelToken,
    protocols: HashMap<String, Box<dyn Protocol>>,
    diagnostics: Mutex<HashMap<String, Box<dyn Action>>>,
    job_action_timeouts: HashMap<String, TimeoutSpec>,
    job_connection_timeouts: HashMap<String, TimeoutSpec>,
    device_action_timeouts: HashMap<String, TimeoutSpec>,
    device_connection_timeouts: HashMap<String, TimeoutSpec>,
}

impl Job {
    pub fn new(device: serde_json::Value, timeout: Timeout) -> Self {
        Self {
            device,
            timeout,
            context: Context::new(),
            cancel: CancelToken::new(),
            protocols: HashMap::new(),
            diagnostics: Mutex::new(HashMap::new()),
            job_action_timeouts: HashMap::new(),
            job_connection_timeouts: HashMap::new(),
            device_action_timeouts: HashMap::new(),
            device_connection_timeouts: HashMap::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn register_protocol(&mut self, protocol: Box<dyn Protocol>) {
        self.protocols.insert(protocol.name().to_string(), protocol);
    }

    pub fn protocol(&self, name: &str) -> Option<&dyn Protocol> {
        self.protocols.get(name).map(AsRef::as_ref)
    }

    /// Register the action run in response to trigger token `token`.
    pub fn register_diagnostic(&mut self, token: impl Into<String>, action: Box<dyn Action>) {
        self.diagnostics.lock().insert(token.into(), action);
    }

    /// Run the diagnostic registered for `token`, threading `connection`
    /// through it. Fails with [`EngineError::Internal`] if no diagnostic is
    /// registered for `token` (§4.3: "Missing diagnostic ⇒ RuntimeError").
    pub async fn run_diagnostic(
        &self,
        token: &str,
        connection: Option<ConnectionHandle>,
    ) -> Result<Option<ConnectionHandle>, EngineError> {
        // Held across the `.await` below: a diagnostic action must not itself
        // trigger another diagnostic, or this deadlocks on the same mutex.
        let mut guard = self.diagnostics.lock();
        let Some(action) = guard.get_mut(token) else {
            return Err(EngineError::Internal(format!(
                "no diagnostic registered for trigger '{token}'"
            )));
        };
        action.run(connection, self).await
    }

    pub fn set_job_action_timeout(&mut self, name: impl Into<String>, spec: TimeoutSpec) {
        self.job_action_timeouts.insert(name.into(), spec);
    }

    pub fn set_job_connection_timeout(&mut self, name: impl Into<String>, spec: TimeoutSpec) {
        self.job_connection_timeouts.insert(name.into(), spec);
    }

    pub fn set_device_action_timeout(&mut self, name: impl Into<String>, spec: TimeoutSpec) {
        self.device_action_timeouts.insert(name.into(), spec);
    }

    pub fn set_device_connection_timeout(&mut self, name: impl Into<String>, spec: TimeoutSpec) {
        self.device_connection_timeouts.insert(name.into(), spec);
    }

    /// The override seconds for `name`, and which source supplied them, with
    /// job input taking precedence over the device descriptor (§3, §8
    /// scenario 6). `None` means neither side names an override for `name`,
    /// leaving the action's own constructor default untouched.
    pub fn override_for(&self, kind: TimeoutKind, name: &str) -> Option<(u64, TimeoutSource)> {
        let (job_table, device_table) = match kind {
            TimeoutKind::Action => (&self.job_action_timeouts, &self.device_action_timeouts),
            TimeoutKind::Connection => (
                &self.job_connection_timeouts,
                &self.device_connection_timeouts,
            ),
        };
        if let Some(spec) = job_table.get(name) {
            return Some((spec.parse(), TimeoutSource::JobInput));
        }
        if let Some(spec) = device_table.get(name) {
            return Some((spec.parse(), TimeoutSource::DeviceDescriptor));
        }
        None
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
