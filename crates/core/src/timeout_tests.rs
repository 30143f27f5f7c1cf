use super::*;
use crate::error::ErrorCategory;
use std::time::Duration as StdDuration;

#[yare::parameterized(
    seconds_only = { TimeoutSpec { seconds: 45, ..Default::default() }, 45 },
    minutes_only = { TimeoutSpec { minutes: 2, ..Default::default() }, 120 },
    hours_only = { TimeoutSpec { hours: 1, ..Default::default() }, 3600 },
    days_only = { TimeoutSpec { days: 1, ..Default::default() }, 86400 },
    mixed = { TimeoutSpec { days: 1, hours: 1, minutes: 1, seconds: 1 }, 90061 },
    empty = { TimeoutSpec::default(), 0 },
)]
fn parse_sums_fields(spec: TimeoutSpec, expected_seconds: u64) {
    assert_eq!(spec.parse(), expected_seconds);
}

#[test]
fn new_uses_default_duration() {
    let t = Timeout::new("boot");
    assert_eq!(t.duration_seconds, DEFAULT_DURATION_SECONDS);
    assert!(!t.protected);
}

#[test]
fn job_input_clamps_to_minimum() {
    let mut t = Timeout::new("boot");
    t.modify(0, TimeoutSource::JobInput).unwrap();
    assert_eq!(t.duration_seconds, 1);
}

#[test]
fn job_input_clamps_to_maximum() {
    let mut t = Timeout::new("boot");
    t.modify(CLAMP_SECONDS * 10, TimeoutSource::JobInput).unwrap();
    assert_eq!(t.duration_seconds, CLAMP_SECONDS);
}

#[test]
fn job_input_within_range_is_unchanged() {
    let mut t = Timeout::new("boot");
    t.modify(30, TimeoutSource::JobInput).unwrap();
    assert_eq!(t.duration_seconds, 30);
}

#[test]
fn device_descriptor_may_exceed_clamp() {
    let mut t = Timeout::new("flash");
    t.modify(CLAMP_SECONDS * 3, TimeoutSource::DeviceDescriptor)
        .unwrap();
    assert_eq!(t.duration_seconds, CLAMP_SECONDS * 3);
}

#[test]
fn action_default_may_exceed_clamp() {
    let mut t = Timeout::new("flash");
    t.modify(CLAMP_SECONDS * 3, TimeoutSource::ActionDefault)
        .unwrap();
    assert_eq!(t.duration_seconds, CLAMP_SECONDS * 3);
}

#[test]
fn protected_timeout_rejects_job_input() {
    let mut t = Timeout::protected("boot", 60);
    let err = t.modify(30, TimeoutSource::JobInput).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ProtectedTimeout);
    assert_eq!(t.duration_seconds, 60, "unchanged on rejection");
}

#[test]
fn protected_timeout_still_accepts_device_and_action_sources() {
    let mut t = Timeout::protected("boot", 60);
    t.modify(90, TimeoutSource::DeviceDescriptor).unwrap();
    assert_eq!(t.duration_seconds, 90);
}

#[tokio::test]
async fn scoped_returns_value_within_budget() {
    let t = Timeout::new("quick");
    let result = t.scoped(async { 42 }).await.unwrap();
    assert_eq!(result, 42);
}

#[tokio::test(start_paused = true)]
async fn scoped_times_out_and_reports_name_and_duration() {
    let mut t = Timeout::new("slow");
    t.modify(1, TimeoutSource::ActionDefault).unwrap();

    let err = t
        .scoped(async {
            tokio::time::sleep(StdDuration::from_secs(5)).await;
        })
        .await
        .unwrap_err();

    match err {
        EngineError::JobTimeout {
            name,
            duration_seconds,
        } => {
            assert_eq!(name, "slow");
            assert_eq!(duration_seconds, 1);
        }
        other => panic!("expected JobTimeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn scoped_does_not_fire_after_body_returns() {
    let t = Timeout::new("quick");
    let result = t.scoped(async { "done" }).await.unwrap();
    assert_eq!(result, "done");
    // Advancing time after the scope exits must not retroactively time it out.
    tokio::time::advance(StdDuration::from_secs(DEFAULT_DURATION_SECONDS * 2)).await;
}
