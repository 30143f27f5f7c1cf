// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Executor`]: the top-level driver (§4.5). Builds the root pipeline from
//! a parsed job description via the [`Registry`], wires the job-global
//! timeout, installs cooperative cancellation on INT/TERM, and runs
//! `validate` → `prepare` → `run` → `post_process` in order.

use crate::action::Action;
use crate::job::Job;
use crate::pipeline::Pipeline;
use crate::registry::Registry;
use rigpipe_core::{EngineError, Timeout, TimeoutSpec};

/// One action entry from a parsed job tree: a phase key (`"boot"`, `"test"`,
/// …), its parameter block, and any children to attach to its
/// `internal_pipeline` once it is constructed and inserted.
pub struct ActionSpec {
    pub kind: String,
    pub params: serde_json::Value,
    pub children: Vec<ActionSpec>,
}

impl ActionSpec {
    pub fn leaf(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
            children: Vec::new(),
        }
    }
}

/// The process exit code matching §6: zero on success, non-zero on
/// cancellation, job timeout, or any other failure.
pub fn exit_code(result: &Result<(), EngineError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(EngineError::Cancelled) => 130,
        Err(EngineError::JobTimeout { .. }) => 124,
        Err(_) => 1,
    }
}

/// Builds and runs exactly one job tree to completion or failure.
pub struct Executor {
    job: Job,
    root: Pipeline,
}

impl Executor {
    /// Build the root pipeline from `specs` by asking `registry` to select
    /// and instantiate a strategy for each entry, recursing into children via
    /// the two-phase builder pattern: `add_action` first inserts the action,
    /// then the just-inserted handle's `internal_pipeline_mut` is used to
    /// attach its children, since `add_action` takes the action by value.
    pub fn build(job: Job, registry: &Registry, specs: &[ActionSpec]) -> Result<Self, EngineError> {
        let mut root = Pipeline::root();
        attach(&mut root, registry, specs, &job)?;
        Ok(Self { job, root })
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn root(&self) -> &Pipeline {
        &self.root
    }

    /// Validate the tree, then run `prepare` → `run` → `post_process` over
    /// it, with cooperative INT/TERM cancellation raced against the whole
    /// run. `cleanup_actions`/`finalize` are guaranteed by `Pipeline::run_actions`
    /// itself on every exit path from the main run; this method additionally
    /// cancels on a signal even before any action starts.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        self.root.validate_root()?;

        let cancel = self.job.cancel_token().clone();
        tokio::spawn(async move {
            listen_for_shutdown_signals().await;
            cancel.cancel();
        });

        self.root.prepare_actions().await?;
        let connection = self.root.run_actions(None, &self.job).await?;
        drop(connection);
        self.root.post_process_actions().await?;
        Ok(())
    }

    /// A recursive, level-ordered document suitable for serialization (§4.3).
    pub fn describe(&self, verbose: bool) -> serde_json::Value {
        self.root.describe(verbose)
    }
}

fn attach(
    pipeline: &mut Pipeline,
    registry: &Registry,
    specs: &[ActionSpec],
    job: &Job,
) -> Result<(), EngineError> {
    for spec in specs {
        let action = registry.select(&spec.kind, &job.device, &spec.params)?;
        pipeline.add_action(action, spec.params.clone(), job)?;

        if !spec.children.is_empty() {
            let Some(inserted) = pipeline.actions_mut().last_mut() else {
                return Err(EngineError::Internal(
                    "add_action returned Ok but inserted no action".to_string(),
                ));
            };
            if let Some(nested) = inserted.internal_pipeline_mut() {
                attach(nested, registry, &spec.children, job)?;
            } else {
                return Err(EngineError::Job(format!(
                    "action kind '{}' does not accept nested actions",
                    spec.kind
                )));
            }
        }
    }
    Ok(())
}

/// The job-global timeout named `"job-timeout"`, read from `spec` and
/// clamped as job input (§6: `timeouts.job`).
pub fn job_timeout_from_spec(spec: TimeoutSpec) -> Result<Timeout, EngineError> {
    let mut timeout = Timeout::new("job-timeout");
    timeout.modify(spec.parse(), rigpipe_core::TimeoutSource::JobInput)?;
    Ok(timeout)
}

async fn listen_for_shutdown_signals() {
    #[cfg(unix)]
    {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
                unreachable!()
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received interrupt signal");
            }
            _ = terminate.recv() => {
                tracing::warn!("received termination signal");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::warn!("received interrupt signal");
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
