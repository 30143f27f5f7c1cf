use super::*;
use crate::action::ActionState;
use async_trait::async_trait;
use rigpipe_core::Timeout;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FlakyAction {
    state: ActionState,
    failures_remaining: Arc<AtomicUsize>,
    run_count: Arc<AtomicUsize>,
}

#[async_trait]
impl Action for FlakyAction {
    fn name(&self) -> &'static str {
        "flaky"
    }
    fn summary(&self) -> &str {
        "fails a fixed number of times then succeeds"
    }
    fn description(&self) -> &str {
        "fails a fixed number of times then succeeds"
    }
    fn section(&self) -> &str {
        "test"
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
        self.run_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            self.state.errors.push("infrastructure blip".to_string());
            Err(EngineError::Infrastructure("infrastructure blip".to_string()))
        } else {
            Ok(connection)
        }
    }
}

fn test_job() -> Job {
    Job::new(serde_json::Value::Null, Timeout::new("job-timeout"))
}

#[test]
fn populate_rejects_both_failure_retry_and_repeat() {
    let mut retry = RetryAction::new();
    let err = retry
        .populate(&serde_json::json!({"failure_retry": 2, "repeat": 3}))
        .expect_err("specifying both must fail");
    assert!(matches!(err, EngineError::Job(_)));
}

#[test]
fn populate_defaults_to_one_attempt() {
    let mut retry = RetryAction::new();
    retry.populate(&serde_json::Value::Null).unwrap();
    assert_eq!(retry.state().max_retries, 1);
}

#[test]
fn populate_reads_failure_retry_count() {
    let mut retry = RetryAction::new();
    retry
        .populate(&serde_json::json!({"failure_retry": 3}))
        .unwrap();
    assert_eq!(retry.state().max_retries, 3);
}

#[test]
fn populate_reads_repeat_count() {
    let mut retry = RetryAction::new();
    retry.populate(&serde_json::json!({"repeat": 5})).unwrap();
    assert_eq!(retry.state().max_retries, 5);
}

#[tokio::test]
async fn absorbs_two_infrastructure_errors_then_succeeds() {
    let job = test_job();
    let mut retry = RetryAction::new();
    retry
        .populate(&serde_json::json!({"failure_retry": 3}))
        .unwrap();

    let run_count = Arc::new(AtomicUsize::new(0));
    let flaky = FlakyAction {
        state: ActionState::new("flaky"),
        failures_remaining: Arc::new(AtomicUsize::new(2)),
        run_count: run_count.clone(),
    };
    retry
        .pipeline_mut()
        .add_action(Box::new(flaky), serde_json::Value::Null, &job)
        .unwrap();

    let result = retry.run(None, &job).await;
    assert!(result.is_ok(), "expected eventual success, got {result:?}");
    assert_eq!(run_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausting_retries_propagates_the_last_error() {
    let job = test_job();
    let mut retry = RetryAction::new();
    retry
        .populate(&serde_json::json!({"failure_retry": 2}))
        .unwrap();

    let run_count = Arc::new(AtomicUsize::new(0));
    let flaky = FlakyAction {
        state: ActionState::new("flaky"),
        failures_remaining: Arc::new(AtomicUsize::new(5)),
        run_count: run_count.clone(),
    };
    retry
        .pipeline_mut()
        .add_action(Box::new(flaky), serde_json::Value::Null, &job)
        .unwrap();

    let err = retry.run(None, &job).await.expect_err("must exhaust retries");
    assert!(matches!(err, EngineError::Infrastructure(_)));
    assert_eq!(run_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn repeat_mode_runs_the_full_count_even_after_success() {
    let job = test_job();
    let mut retry = RetryAction::new();
    retry.populate(&serde_json::json!({"repeat": 3})).unwrap();

    let run_count = Arc::new(AtomicUsize::new(0));
    let always_passes = FlakyAction {
        state: ActionState::new("flaky"),
        failures_remaining: Arc::new(AtomicUsize::new(0)),
        run_count: run_count.clone(),
    };
    retry
        .pipeline_mut()
        .add_action(Box::new(always_passes), serde_json::Value::Null, &job)
        .unwrap();

    let result = retry.run(None, &job).await;
    assert!(result.is_ok());
    assert_eq!(run_count.load(Ordering::SeqCst), 3);
}
