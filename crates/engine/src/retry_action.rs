// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`RetryAction`]: an action wrapping an internal pipeline with bounded
//! retries, distinguishing `failure_retry` (stop on first success) from
//! `repeat` (always run the full count).

use crate::action::{elapsed_seconds, Action, ActionState};
use crate::connection::ConnectionHandle;
use crate::job::Job;
use crate::level::Level;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use rigpipe_core::EngineError;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RetryMode {
    FailureRetry,
    Repeat,
}

/// Wraps an internal [`Pipeline`] whose children are attached after
/// construction (see `Pipeline::actions_mut` for why: `populate` only fixes
/// the retry count and the pipeline's level prefix, the tree builder adds
/// the actual wrapped actions once this action has been inserted into its
/// parent and so has a level to inherit).
pub struct RetryAction {
    state: ActionState,
    pipeline: Pipeline,
    mode: RetryMode,
}

impl RetryAction {
    pub fn new() -> Self {
        Self {
            state: ActionState::new("retry"),
            pipeline: Pipeline::nested(Level::root_branch()),
            mode: RetryMode::FailureRetry,
        }
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }
}

impl Default for RetryAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for RetryAction {
    fn name(&self) -> &'static str {
        "retry"
    }
    fn summary(&self) -> &str {
        "retries its wrapped actions on recoverable failure"
    }
    fn description(&self) -> &str {
        "retries its wrapped actions on recoverable failure"
    }
    fn section(&self) -> &str {
        "control"
    }

    fn state(&self) -> &ActionState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn internal_pipeline(&self) -> Option<&Pipeline> {
        Some(&self.pipeline)
    }
    fn internal_pipeline_mut(&mut self) -> Option<&mut Pipeline> {
        Some(&mut self.pipeline)
    }

    /// Reads `failure_retry` xor `repeat` from `params`; specifying both is
    /// a validation error. Re-anchors the internal pipeline's level prefix
    /// to this action's own level, now that `add_action` has assigned it.
    fn populate(&mut self, params: &serde_json::Value) -> Result<(), EngineError> {
        self.pipeline = Pipeline::nested(self.state.level.clone());

        let failure_retry = params.get("failure_retry").and_then(|v| v.as_u64());
        let repeat = params.get("repeat").and_then(|v| v.as_u64());
        match (failure_retry, repeat) {
            (Some(_), Some(_)) => Err(EngineError::Job(
                "RetryAction: specify only one of 'failure_retry' or 'repeat'".to_string(),
            )),
            (Some(n), None) => {
                self.mode = RetryMode::FailureRetry;
                self.state.max_retries = n.max(1) as u32;
                Ok(())
            }
            (None, Some(n)) => {
                self.mode = RetryMode::Repeat;
                self.state.max_retries = n.max(1) as u32;
                Ok(())
            }
            (None, None) => {
                self.mode = RetryMode::FailureRetry;
                self.state.max_retries = 1;
                Ok(())
            }
        }
    }

    async fn run(
        &mut self,
        connection: Option<ConnectionHandle>,
        job: &Job,
    ) -> Result<Option<ConnectionHandle>, EngineError> {
        let max_retries = self.state.max_retries.max(1);
        let mut conn = connection;
        let mut last_err: Option<EngineError> = None;
        let start = Instant::now();

        for attempt in 1..=max_retries {
            match self.pipeline.run_actions(conn.take(), job).await {
                Ok(returned) => {
                    conn = returned;
                    last_err = None;
                    if self.mode == RetryMode::FailureRetry {
                        break;
                    }
                }
                Err(err) if err.is_recoverable() && attempt < max_retries => {
                    tracing::warn!(
                        attempt,
                        max_retries,
                        error = %err,
                        "recoverable error, retrying"
                    );
                    reset_subtree_errors(&mut self.pipeline);
                    conn = None;
                    last_err = Some(err);
                }
                Err(err) => {
                    self.state.elapsed_time = Some(elapsed_seconds(start));
                    return Err(err);
                }
            }
        }

        self.state.elapsed_time = Some(elapsed_seconds(start));
        match last_err {
            Some(err) => Err(err),
            None => Ok(conn),
        }
    }
}

fn reset_subtree_errors(pipeline: &mut Pipeline) {
    for action in pipeline.actions_mut() {
        action.state_mut().errors.clear();
        if let Some(nested) = action.internal_pipeline_mut() {
            reset_subtree_errors(nested);
        }
    }
}

#[cfg(test)]
#[path = "retry_action_tests.rs"]
mod tests;
