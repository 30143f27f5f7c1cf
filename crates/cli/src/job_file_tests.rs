use super::*;
use serde_json::json;

#[test]
fn parses_job_name_and_flat_timeouts() {
    let doc = json!({
        "job_name": "smoke-test",
        "timeouts": { "job": { "minutes": 5 } },
        "actions": [ { "finalize": {} } ],
    });
    let parsed = parse_job_document(&doc).unwrap();
    assert_eq!(parsed.job_name, "smoke-test");
    assert_eq!(parsed.job_timeout.parse(), 300);
    assert!(parsed.action_timeouts.is_empty());
    assert!(parsed.connection_timeouts.is_empty());
    assert_eq!(parsed.actions.len(), 1);
    assert_eq!(parsed.actions[0].kind, "finalize");
}

#[test]
fn missing_job_name_is_a_job_error() {
    let doc = json!({ "actions": [] });
    let err = parse_job_document(&doc).unwrap_err();
    assert!(matches!(err, EngineError::Job(_)));
}

#[test]
fn missing_actions_is_a_job_error() {
    let doc = json!({ "job_name": "x" });
    let err = parse_job_document(&doc).unwrap_err();
    assert!(matches!(err, EngineError::Job(_)));
}

#[test]
fn parses_action_and_connection_timeout_override_tables() {
    let doc = json!({
        "job_name": "smoke-test",
        "timeouts": {
            "actions": { "boot": { "seconds": 90 } },
            "connections": { "serial": { "seconds": 10 } },
        },
        "actions": [],
    });
    let parsed = parse_job_document(&doc).unwrap();
    assert_eq!(parsed.action_timeouts.get("boot").unwrap().parse(), 90);
    assert_eq!(parsed.connection_timeouts.get("serial").unwrap().parse(), 10);
}

#[test]
fn nested_actions_array_becomes_children_and_is_stripped_from_params() {
    let doc = json!({
        "job_name": "smoke-test",
        "actions": [
            {
                "retry": {
                    "failure_retry": 3,
                    "actions": [ { "boot": { "mode": "fastboot" } } ],
                }
            }
        ],
    });
    let parsed = parse_job_document(&doc).unwrap();
    assert_eq!(parsed.actions.len(), 1);
    let retry = &parsed.actions[0];
    assert_eq!(retry.kind, "retry");
    assert_eq!(retry.params.get("failure_retry").unwrap(), 3);
    assert!(retry.params.get("actions").is_none());
    assert_eq!(retry.children.len(), 1);
    assert_eq!(retry.children[0].kind, "boot");
    assert_eq!(
        retry.children[0].params.get("mode").unwrap(),
        "fastboot"
    );
}

#[test]
fn action_entry_with_more_than_one_key_is_rejected() {
    let doc = json!({
        "job_name": "smoke-test",
        "actions": [ { "boot": {}, "test": {} } ],
    });
    let err = parse_job_document(&doc).unwrap_err();
    assert!(matches!(err, EngineError::Job(_)));
}

#[test]
fn device_timeouts_are_read_independently_of_job_document() {
    let doc = json!({
        "timeouts": {
            "actions": { "boot": { "minutes": 2 } },
        },
    });
    let (action_timeouts, connection_timeouts) = parse_device_timeouts(&doc).unwrap();
    assert_eq!(action_timeouts.get("boot").unwrap().parse(), 120);
    assert!(connection_timeouts.is_empty());
}
