// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`Action`] contract: a unit of work with lifecycle hooks, parameters,
//! timeout, errors, results, and an optional nested pipeline.

use crate::connection::ConnectionHandle;
use crate::job::Job;
use crate::level::Level;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use rigpipe_core::{EngineError, Timeout};
use std::process::Stdio;
use tokio::time::Instant;

/// The fields common to every action, independent of its concrete strategy.
///
/// `level` is assigned once by [`Pipeline::add_action`] and must not be
/// mutated afterwards (a retry wrapper re-entering its own subtree keeps the
/// same level across attempts). `parameters`, once assigned, is read-only —
/// overrides are composed and copied into a fresh value *before* assignment.
pub struct ActionState {
    pub level: Level,
    pub parameters: serde_json::Value,
    pub timeout: Timeout,
    pub connection_timeout: Timeout,
    pub max_retries: u32,
    pub errors: Vec<String>,
    pub results: Vec<(String, serde_json::Value)>,
    pub elapsed_time: Option<f64>,
}

impl ActionState {
    /// A fresh state with unassigned level (set by `add_action`) and default
    /// timeouts named after `kind`.
    pub fn new(kind: &str) -> Self {
        Self {
            level: Level::root_branch(),
            parameters: serde_json::Value::Null,
            timeout: Timeout::new(format!("{kind}-timeout")),
            connection_timeout: Timeout::new(format!("{kind}-connection-timeout")),
            max_retries: 1,
            errors: Vec::new(),
            results: Vec::new(),
            elapsed_time: None,
        }
    }
}

/// A unit of work in the pipeline, possibly containing a nested pipeline.
#[async_trait]
pub trait Action: Send + Sync {
    /// Static kind identifier. Must be non-empty and contain no whitespace.
    fn name(&self) -> &'static str;
    fn summary(&self) -> &str;
    fn description(&self) -> &str;
    fn section(&self) -> &str;

    fn state(&self) -> &ActionState;
    fn state_mut(&mut self) -> &mut ActionState;

    /// The nested pipeline this action owns, if any.
    fn internal_pipeline(&self) -> Option<&Pipeline> {
        None
    }
    fn internal_pipeline_mut(&mut self) -> Option<&mut Pipeline> {
        None
    }

    /// Pure check; appends to `errors`. MUST NOT perform I/O that can hang.
    fn validate(&mut self) {
        let mut errors = Vec::new();
        let name = self.name();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            errors.push(format!(
                "action name '{name}' must be non-empty and contain no whitespace"
            ));
        }
        if self.summary().is_empty() {
            errors.push(format!("action '{name}' is missing a summary"));
        }
        if self.description().is_empty() {
            errors.push(format!("action '{name}' is missing a description"));
        }
        if self.section().is_empty() {
            errors.push(format!("action '{name}' is missing a section"));
        }
        self.state_mut().errors.extend(errors);
        if let Some(pipeline) = self.internal_pipeline_mut() {
            pipeline.validate_actions();
        }
    }

    /// True iff locally valid and, when present, every descendant is valid.
    fn is_valid(&self) -> bool {
        self.state().errors.is_empty()
            && self
                .internal_pipeline()
                .map(Pipeline::is_valid)
                .unwrap_or(true)
    }

    /// Build `internal_pipeline` from the resolved parameter block. Called
    /// exactly once, during construction, after the action is attached to a
    /// parent pipeline.
    fn populate(&mut self, _params: &serde_json::Value) -> Result<(), EngineError> {
        Ok(())
    }

    /// Pre-run hook, invoked over the whole tree before the main run.
    async fn prepare(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Post-run hook, invoked over the whole tree after the main run.
    async fn post_process(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Perform the work. The default implementation calls protocols, then
    /// delegates to `internal_pipeline` if present; otherwise it propagates
    /// the incoming connection after attaching `connection_timeout`.
    async fn run(
        &mut self,
        connection: Option<ConnectionHandle>,
        job: &Job,
    ) -> Result<Option<ConnectionHandle>, EngineError> {
        call_protocols(self, job).await?;
        if let Some(pipeline) = self.internal_pipeline_mut() {
            pipeline.run_actions(connection, job).await
        } else if let Some(mut conn) = connection {
            conn.set_timeout(self.state().connection_timeout.duration());
            Ok(Some(conn))
        } else {
            Ok(None)
        }
    }

    /// Called only when `run` raised; releases resources not covered by a
    /// scoped guard inside `run`.
    async fn cleanup(&mut self) {}
}

/// For each protocol named in `parameters.protocols` and supported by `job`,
/// invoke it with a normalized call descriptor and store the collated
/// `(key, value)` under `common/<protocol-name>/<key>`.
///
/// Call order across distinct protocols within one action is unspecified;
/// callers must not depend on it.
pub async fn call_protocols(action: &mut dyn Action, job: &Job) -> Result<(), EngineError> {
    let names = protocol_names(&action.state().parameters);
    for name in names {
        let Some(protocol) = job.protocol(&name) else {
            continue;
        };
        let descriptor = normalize_call_descriptor(&action.state().parameters, &name);
        protocol.check_timeout(&action.state().connection_timeout, &descriptor)?;
        let reply = protocol.call(&descriptor).await?;
        if let Some((key, value)) = protocol.collate(&reply, &descriptor) {
            job.context().set_common_data(&name, &key, value);
        }
    }
    Ok(())
}

fn protocol_names(parameters: &serde_json::Value) -> Vec<String> {
    parameters
        .get("protocols")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Strip parser-only annotations (keys prefixed with `_`) from the
/// per-protocol call descriptor embedded in an action's parameters.
fn normalize_call_descriptor(parameters: &serde_json::Value, protocol_name: &str) -> serde_json::Value {
    let raw = parameters
        .get("protocol_options")
        .and_then(|opts| opts.get(protocol_name))
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    match raw {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter().filter(|(k, _)| !k.starts_with('_')).collect(),
        ),
        other => other,
    }
}

/// The outcome of [`run_command`] when `allow_silent` is set.
pub enum CommandOutcome {
    /// Captured, UTF-8-decoded combined stdout+stderr.
    Output(String),
    /// Exited zero with empty output and `allow_silent` was set.
    Silent,
}

/// Launch an external process without a shell, capture combined
/// stdout+stderr, and decode it as UTF-8.
///
/// The call is wrapped in `action`'s `connection_timeout` using the same
/// scoped-timeout mechanism every other bounded operation uses. On a
/// non-zero exit the captured output is appended to `action.state().errors`
/// and a [`EngineError::Job`] is returned; on a spawn/IO failure the error
/// string is appended instead and an [`EngineError::Infrastructure`] is
/// returned.
pub async fn run_command(
    action: &mut dyn Action,
    program: &str,
    args: &[String],
    allow_silent: bool,
) -> Result<CommandOutcome, EngineError> {
    let timeout = action.state().connection_timeout.clone();
    let description = std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(command = %description, "running command");

    let outcome = timeout
        .scoped(
            tokio::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await?;

    match outcome {
        Ok(output) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            tracing::info!(command = %description, output = %combined, "command finished");

            if output.status.success() {
                if allow_silent && combined.trim().is_empty() {
                    Ok(CommandOutcome::Silent)
                } else {
                    Ok(CommandOutcome::Output(combined))
                }
            } else {
                action.state_mut().errors.push(combined.clone());
                Err(EngineError::Job(format!(
                    "command '{description}' exited with {}: {combined}",
                    output.status
                )))
            }
        }
        Err(io_err) => {
            let message = io_err.to_string();
            action.state_mut().errors.push(message.clone());
            Err(EngineError::Infrastructure(message))
        }
    }
}

/// Elapsed wall-clock seconds between `start` and now, for result records.
///
/// Takes `tokio::time::Instant` (not `std::time::Instant`) so elapsed-time
/// bookkeeping stays consistent with `Timeout::scoped` under a paused test
/// clock.
pub fn elapsed_seconds(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

/// Build `action`'s result record (§6), or `None` if it recorded no results
/// this run — only actions that call `state_mut().results.push(...)`
/// produce one, mirroring the source's own guard on a non-empty `results`.
///
/// `timeout`/`connection-timeout` are emitted under distinct keys rather
/// than conflated into one `timeout` key.
pub fn build_result_record(action: &dyn Action) -> Option<serde_json::Value> {
    let state = action.state();
    if state.results.is_empty() {
        return None;
    }
    let extra: serde_json::Map<String, serde_json::Value> =
        state.results.iter().cloned().collect();
    Some(serde_json::json!({
        "definition": "rigpipe",
        "case": action.name(),
        "level": state.level.to_string(),
        "duration": state.elapsed_time,
        "result": if state.errors.is_empty() { "pass" } else { "fail" },
        "extra": extra,
        "timeout": state.timeout.duration_seconds,
        "connection-timeout": state.connection_timeout.duration_seconds,
    }))
}

/// Emit `action`'s result record through the logging facade (§4.7), if it
/// recorded any results this run.
pub fn log_action_results(action: &dyn Action) {
    if let Some(record) = build_result_record(action) {
        tracing::info!(result = %record, "result");
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
