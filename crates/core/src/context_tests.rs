use super::*;
use serde_json::json;
use std::sync::Arc;

#[test]
fn deep_copy_read_is_equal_but_independent() {
    let ctx = Context::new();
    ctx.set_common_data("common", "x", json!([1, 2]));

    let a = ctx.get_common_data("common", "x").unwrap();
    let b = ctx.get_common_data("common", "x").unwrap();
    assert_eq!(a, b);

    // Neither copy is backed by the stored Arc: mutating one leaves the
    // store, and any other deep copy, untouched.
    let mut mutated = a;
    if let serde_json::Value::Array(ref mut v) = mutated {
        v.push(json!(3));
    }
    let still_stored = ctx.get_common_data("common", "x").unwrap();
    assert_eq!(still_stored, json!([1, 2]));
}

#[test]
fn aliased_read_shares_the_same_allocation() {
    let ctx = Context::new();
    ctx.set_common_data("common", "x", json!([1, 2]));

    let a = ctx.get_common_data_aliased("common", "x").unwrap();
    let b = ctx.get_common_data_aliased("common", "x").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn overwrite_replaces_value() {
    let ctx = Context::new();
    ctx.set_common_data("common", "x", json!(1));
    ctx.set_common_data("common", "x", json!(2));
    assert_eq!(ctx.get_common_data("common", "x").unwrap(), json!(2));
}

#[test]
fn namespaces_are_independent() {
    let ctx = Context::new();
    ctx.set_common_data("common", "port", json!(1));
    ctx.set_common_data("lxc", "port", json!(2));
    assert_eq!(ctx.get_common_data("common", "port").unwrap(), json!(1));
    assert_eq!(ctx.get_common_data("lxc", "port").unwrap(), json!(2));
}

#[test]
fn missing_key_is_none() {
    let ctx = Context::new();
    assert!(ctx.get_common_data("common", "missing").is_none());
}

#[test]
fn triggers_drain_in_order() {
    let ctx = Context::new();
    ctx.push_trigger("boot-failed");
    ctx.push_trigger("deploy-failed");
    assert_eq!(ctx.drain_triggers(), vec!["boot-failed", "deploy-failed"]);
    assert!(ctx.drain_triggers().is_empty());
}

#[test]
fn scenario_five_end_to_end() {
    // A sets common/x/y = [1,2]; B reads with deep copy and mutates;
    // subsequent read by C still sees [1,2].
    let ctx = Context::new();
    ctx.set_common_data("x", "y", json!([1, 2]));

    let mut b_copy = ctx.get_common_data("x", "y").unwrap();
    if let serde_json::Value::Array(ref mut v) = b_copy {
        v.push(json!(99));
    }

    let c_view = ctx.get_common_data("x", "y").unwrap();
    assert_eq!(c_view, json!([1, 2]));
}
