// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Pipeline`]: an ordered, leveled container of actions with the core
//! scheduling loop, diagnostic dispatch, and teardown.

use crate::action::{log_action_results, Action};
use crate::connection::ConnectionHandle;
use crate::job::{Job, TimeoutKind};
use crate::level::Level;
use rigpipe_core::EngineError;
use tokio::time::Instant;

/// An ordered sequence of actions sharing a parent and a level prefix.
///
/// The root pipeline (`is_root`) is the only one that checks the job-global
/// timeout, runs full cleanup on a domain error, and calls `finalize`; a
/// pipeline nested inside an action (or a `RetryAction`'s internal pipeline)
/// only runs its own actions and propagates failures upward.
pub struct Pipeline {
    level_prefix: Level,
    is_root: bool,
    actions: Vec<Box<dyn Action>>,
}

impl Pipeline {
    /// The job's root pipeline: `branch_level = 1`.
    pub fn root() -> Self {
        Self {
            level_prefix: Level::root_branch(),
            is_root: true,
            actions: Vec::new(),
        }
    }

    /// A pipeline nested inside an action, whose own level becomes the
    /// child pipeline's level prefix (§3: a child pipeline inherits its
    /// branch level from its parent action's level, not from the root's).
    pub fn nested(owner_level: Level) -> Self {
        Self {
            level_prefix: owner_level,
            is_root: false,
            actions: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    /// Mutable access for a tree builder to recurse into a just-inserted
    /// action's `internal_pipeline` and for a `RetryAction` to reset its
    /// subtree's errors between attempts.
    pub fn actions_mut(&mut self) -> &mut [Box<dyn Action>] {
        &mut self.actions
    }

    /// Assign `action`'s level, let it `populate` from a private copy of
    /// `params`, apply job/device timeout overrides (highest precedence,
    /// applied last so they win), then attach the resolved parameters.
    ///
    /// `params` is owned by this call, never aliased with a caller's
    /// parameter object, which is what resolves §9's open question about the
    /// source mutating a shared parameter dictionary on override.
    pub fn add_action(
        &mut self,
        mut action: Box<dyn Action>,
        params: serde_json::Value,
        job: &Job,
    ) -> Result<(), EngineError> {
        let k = self.actions.len() + 1;
        action.state_mut().level = self.level_prefix.child(k);

        action.populate(&params)?;

        if let Some((seconds, source)) = job.override_for(TimeoutKind::Action, action.name()) {
            action.state_mut().timeout.modify(seconds, source)?;
        }
        if let Some((seconds, source)) = job.override_for(TimeoutKind::Connection, action.name()) {
            action.state_mut().connection_timeout.modify(seconds, source)?;
        }

        action.state_mut().parameters = params;
        self.actions.push(action);
        Ok(())
    }

    /// Validate every action depth-first (recursion into `internal_pipeline`
    /// happens inside `Action::validate`'s default body).
    pub fn validate_actions(&mut self) {
        for action in self.actions.iter_mut() {
            action.validate();
        }
    }

    pub fn is_valid(&self) -> bool {
        self.actions.iter().all(|a| a.is_valid())
    }

    /// Root-only: validate the whole tree, then fail fast aggregating every
    /// descendant's errors into one [`EngineError::Job`].
    pub fn validate_root(&mut self) -> Result<(), EngineError> {
        self.validate_actions();
        if self.is_valid() {
            return Ok(());
        }
        let mut messages = Vec::new();
        collect_errors(&self.actions, &mut messages);
        Err(EngineError::Job(format!(
            "Invalid job data: {}",
            messages.join("; ")
        )))
    }

    /// Run every action's `prepare` hook, depth-first, before the main run.
    pub async fn prepare_actions(&mut self) -> Result<(), EngineError> {
        for action in self.actions.iter_mut() {
            action.prepare().await?;
            if let Some(pipeline) = action.internal_pipeline_mut() {
                Box::pin(pipeline.prepare_actions()).await?;
            }
        }
        Ok(())
    }

    /// Run every action's `post_process` hook, depth-first, after the main
    /// run. Runs over the whole tree regardless of which actions actually
    /// executed, mirroring `prepare_actions`.
    pub async fn post_process_actions(&mut self) -> Result<(), EngineError> {
        for action in self.actions.iter_mut() {
            action.post_process().await?;
            if let Some(pipeline) = action.internal_pipeline_mut() {
                Box::pin(pipeline.post_process_actions()).await?;
            }
        }
        Ok(())
    }

    /// The core scheduling loop (§4.3).
    pub async fn run_actions(
        &mut self,
        mut connection: Option<ConnectionHandle>,
        job: &Job,
    ) -> Result<Option<ConnectionHandle>, EngineError> {
        let timeout_start = Instant::now();

        for index in 0..self.actions.len() {
            if job.cancel_token().is_cancelled() {
                let message = "Cancelled".to_string();
                self.actions[index].state_mut().errors.push(message.clone());
                tracing::warn!(level = %self.actions[index].state().level, "cancelled before start");
                self.actions[index].cleanup().await;
                if self.is_root {
                    cleanup_actions(&mut self.actions, connection.take(), Some(message), job).await;
                }
                return Err(EngineError::Cancelled);
            }

            if self.is_root && timeout_start.elapsed() > job.timeout.duration() {
                self.actions[index].state_mut().errors.push(format!(
                    "job '{}' timed out after {} seconds",
                    job.timeout.name, job.timeout.duration_seconds
                ));
                tracing::error!(
                    level = %self.actions[index].state().level,
                    "job-global timeout elapsed before action start"
                );
                if let Err(bug) =
                    invoke_finalize_directly(&mut self.actions, connection.take(), job).await
                {
                    return Err(bug);
                }
                return Err(EngineError::JobTimeout {
                    name: job.timeout.name.clone(),
                    duration_seconds: job.timeout.duration_seconds,
                });
            }

            let level = self.actions[index].state().level.clone();
            let name = self.actions[index].name();
            let budget = self.actions[index].state().timeout.duration_seconds;
            tracing::info!(%level, name, max_seconds = budget, "start");
            let start = Instant::now();

            let action_timeout = self.actions[index].state().timeout.clone();
            let run_fut = self.actions[index].run(connection.take(), job);

            let run_result: Result<Option<ConnectionHandle>, EngineError> = tokio::select! {
                biased;
                _ = job.cancel_token().cancelled() => {
                    let message = "Cancelled".to_string();
                    self.actions[index].state_mut().elapsed_time = Some(start.elapsed().as_secs_f64());
                    self.actions[index].state_mut().errors.push(message.clone());
                    tracing::warn!(%level, "action cancelled");
                    self.actions[index].cleanup().await;
                    if self.is_root {
                        cleanup_actions(&mut self.actions, None, Some(message), job).await;
                    }
                    return Err(EngineError::Cancelled);
                }
                scoped = action_timeout.scoped(run_fut) => match scoped {
                    Ok(inner) => inner,
                    Err(timeout_err) => Err(timeout_err),
                },
            };

            match run_result {
                Ok(returned_connection) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    self.actions[index].state_mut().elapsed_time = Some(elapsed);
                    tracing::info!(%level, elapsed_seconds = elapsed, "duration");
                    log_action_results(self.actions[index].as_ref());
                    connection = returned_connection;
                }
                Err(err) if err.is_recoverable() || matches!(err, EngineError::JobTimeout { .. }) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    self.actions[index].state_mut().elapsed_time = Some(elapsed);
                    self.actions[index].state_mut().errors.push(err.to_string());
                    tracing::error!(%level, error = %err, "action failed");
                    log_action_results(self.actions[index].as_ref());

                    let (after_diagnose, diagnose_err) =
                        match diagnose(connection.take(), job).await {
                            Ok(c) => (c, None),
                            Err(e) => (None, Some(e)),
                        };
                    connection = after_diagnose;
                    self.actions[index].cleanup().await;

                    if self.is_root {
                        cleanup_actions(
                            &mut self.actions,
                            connection.take(),
                            Some(err.to_string()),
                            job,
                        )
                        .await;
                    }

                    return Err(diagnose_err.unwrap_or(err));
                }
                // TestError and ProtectedTimeout are not expected to escape
                // `run`: the former is logged and cleared by the action
                // itself, the latter surfaces from `add_action`/`populate`
                // during tree construction, not from a running action. Treat
                // either reaching here as a bug, same as a genuinely
                // unexpected error.
                Err(bug) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    let message = bug.to_string();
                    self.actions[index].state_mut().elapsed_time = Some(elapsed);
                    self.actions[index].state_mut().errors.push(message.clone());
                    tracing::error!(%level, error = %message, "action raised a bug");
                    self.actions[index].cleanup().await;
                    if self.is_root {
                        cleanup_actions(&mut self.actions, None, Some(message.clone()), job).await;
                    }
                    return Err(EngineError::Internal(message));
                }
            }
        }

        Ok(connection)
    }

    /// A recursive, level-ordered document suitable for serialization.
    pub fn describe(&self, verbose: bool) -> serde_json::Value {
        serde_json::Value::Array(
            self.actions
                .iter()
                .map(|a| describe_action(a.as_ref(), verbose))
                .collect(),
        )
    }
}

fn collect_errors(actions: &[Box<dyn Action>], out: &mut Vec<String>) {
    for action in actions {
        out.extend(action.state().errors.iter().cloned());
        if let Some(pipeline) = action.internal_pipeline() {
            collect_errors(&pipeline.actions, out);
        }
    }
}

fn describe_action(action: &dyn Action, verbose: bool) -> serde_json::Value {
    let mut doc = serde_json::json!({
        "kind": action.name(),
        "level": action.state().level.to_string(),
    });
    if verbose {
        doc["summary"] = action.summary().into();
        doc["description"] = action.description().into();
        doc["section"] = action.section().into();
        doc["parameters"] = action.state().parameters.clone();
        doc["timeout_seconds"] = action.state().timeout.duration_seconds.into();
        doc["connection_timeout_seconds"] = action.state().connection_timeout.duration_seconds.into();
        doc["errors"] = action.state().errors.clone().into();
    }
    if let Some(pipeline) = action.internal_pipeline() {
        doc["pipeline"] = pipeline.describe(verbose);
    }
    doc
}

/// Drain the job's trigger queue and run the matching diagnostic for each
/// token, in order. Diagnostics MUST NOT alter the connection they're
/// handed; the engine trusts that contract rather than enforcing it, since
/// there is no way to inspect a `Box<dyn Connection>` without consuming it.
async fn diagnose(
    mut connection: Option<ConnectionHandle>,
    job: &Job,
) -> Result<Option<ConnectionHandle>, EngineError> {
    for token in job.context().drain_triggers() {
        connection = job.run_diagnostic(&token, connection).await?;
    }
    Ok(connection)
}

/// Root-only teardown: sweep every root-level action's `internal_pipeline`
/// for resources that still need releasing, then run `finalize`.
///
/// The per-action error arm above already calls `cleanup` on the one action
/// whose `run` actually raised, and on each ancestor along its propagation
/// path. But a root-level action that already *succeeded* earlier in this
/// run may own an `internal_pipeline` whose actions hold resources that are
/// only released on `cleanup` — nothing calls that when a later sibling
/// fails, since that succeeded action's own `run` returned `Ok`. §8's
/// invariant (cleanup called on every action whose run was entered) is a
/// floor, not a ceiling: it does not forbid also releasing an
/// already-succeeded action's nested resources once the job is tearing
/// down. Logs rather than fails if `finalize` is missing — the
/// job-global-timeout path uses the stricter [`invoke_finalize_directly`]
/// directly when it needs that absence to be fatal.
async fn cleanup_actions(
    actions: &mut [Box<dyn Action>],
    connection: Option<ConnectionHandle>,
    message: Option<String>,
    job: &Job,
) {
    if let Some(message) = &message {
        tracing::warn!(reason = %message, "running root teardown");
    }
    for action in actions.iter_mut() {
        if let Some(pipeline) = action.internal_pipeline_mut() {
            pipeline_cleanup(pipeline).await;
        }
    }
    if let Err(err) = invoke_finalize_directly(actions, connection, job).await {
        tracing::error!(error = %err, "cleanup could not run finalize");
    }
}

/// Recursively release every action in `pipeline`'s resources: `cleanup` on
/// each action, depth-first into its own `internal_pipeline` first, mirroring
/// the source's `pipeline_cleanup`. Unconditional — run regardless of
/// whether the action succeeded, since success does not imply its resources
/// were already released.
async fn pipeline_cleanup(pipeline: &mut Pipeline) {
    for action in pipeline.actions.iter_mut() {
        if let Some(nested) = action.internal_pipeline_mut() {
            Box::pin(pipeline_cleanup(nested)).await;
        }
        action.cleanup().await;
    }
}

/// Locate the root-level `finalize` action and run it directly, ignoring
/// whatever connection it returns. Its absence is a bug ([`EngineError::Internal`]).
async fn invoke_finalize_directly(
    actions: &mut [Box<dyn Action>],
    connection: Option<ConnectionHandle>,
    job: &Job,
) -> Result<(), EngineError> {
    match actions.iter_mut().find(|a| a.name() == "finalize") {
        Some(finalize) => {
            if let Err(err) = finalize.run(connection, job).await {
                tracing::error!(error = %err, "finalize action failed");
            }
            Ok(())
        }
        None => Err(EngineError::Internal(
            "no root-level 'finalize' action registered".to_string(),
        )),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
