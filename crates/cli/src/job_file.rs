// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deserializes an already-parsed job tree and device descriptor (§6) into
//! the engine's [`ActionSpec`] tree and timeout override tables.
//!
//! The YAML job parser and device-descriptor loader are out of scope (§1);
//! this module only bridges the pre-parsed JSON document shapes named in §6
//! to the engine's in-memory representation — it performs no schema
//! validation beyond what is needed to build that representation.

use rigpipe_core::{EngineError, TimeoutSpec};
use rigpipe_engine::ActionSpec;
use std::collections::HashMap;

/// A parsed job document: the pieces the harness needs to drive an
/// [`rigpipe_engine::Executor`].
pub struct ParsedJob {
    pub job_name: String,
    pub job_timeout: TimeoutSpec,
    pub action_timeouts: HashMap<String, TimeoutSpec>,
    pub connection_timeouts: HashMap<String, TimeoutSpec>,
    pub actions: Vec<ActionSpec>,
}

/// Parse a job document shaped per §6: `job_name`, `timeouts.job`, an
/// ordered `actions` list, and optional `timeouts.actions[name]` /
/// `timeouts.connections[name]` override tables.
pub fn parse_job_document(doc: &serde_json::Value) -> Result<ParsedJob, EngineError> {
    let job_name = doc
        .get("job_name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| EngineError::Job("job document is missing 'job_name'".to_string()))?
        .to_string();

    let timeouts = doc.get("timeouts");
    let job_timeout = timeouts
        .and_then(|t| t.get("job"))
        .map(|v| parse_timeout_spec(v))
        .transpose()?
        .unwrap_or_default();

    let action_timeouts = timeouts
        .and_then(|t| t.get("actions"))
        .map(parse_timeout_table)
        .transpose()?
        .unwrap_or_default();

    let connection_timeouts = timeouts
        .and_then(|t| t.get("connections"))
        .map(parse_timeout_table)
        .transpose()?
        .unwrap_or_default();

    let actions = doc
        .get("actions")
        .and_then(|v| v.as_array())
        .ok_or_else(|| EngineError::Job("job document is missing 'actions'".to_string()))?
        .iter()
        .map(parse_action_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedJob {
        job_name,
        job_timeout,
        action_timeouts,
        connection_timeouts,
        actions,
    })
}

/// Device descriptors are consumed whole by strategies (§6); this function
/// only pulls out the optional timeout override tables so the executor can
/// wire them into the `Job`.
pub fn parse_device_timeouts(
    doc: &serde_json::Value,
) -> Result<(HashMap<String, TimeoutSpec>, HashMap<String, TimeoutSpec>), EngineError> {
    let timeouts = doc.get("timeouts");
    let action_timeouts = timeouts
        .and_then(|t| t.get("actions"))
        .map(parse_timeout_table)
        .transpose()?
        .unwrap_or_default();
    let connection_timeouts = timeouts
        .and_then(|t| t.get("connections"))
        .map(parse_timeout_table)
        .transpose()?
        .unwrap_or_default();
    Ok((action_timeouts, connection_timeouts))
}

fn parse_timeout_spec(value: &serde_json::Value) -> Result<TimeoutSpec, EngineError> {
    serde_json::from_value(value.clone())
        .map_err(|e| EngineError::Job(format!("invalid timeout spec: {e}")))
}

fn parse_timeout_table(
    value: &serde_json::Value,
) -> Result<HashMap<String, TimeoutSpec>, EngineError> {
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::Job("timeout override table must be an object".to_string()))?;
    object
        .iter()
        .map(|(name, spec)| Ok((name.clone(), parse_timeout_spec(spec)?)))
        .collect()
}

/// A single action entry is a single-key mapping whose key is the phase and
/// whose value is that phase's parameter block. A nested `actions` array
/// inside the value, if present, is pulled out as children to attach via the
/// engine's two-phase tree builder rather than left in `params` — the wire
/// format for nested pipelines is this harness's own choice, since the job
/// parser that would otherwise define it is out of scope.
fn parse_action_entry(entry: &serde_json::Value) -> Result<ActionSpec, EngineError> {
    let object = entry
        .as_object()
        .ok_or_else(|| EngineError::Job("action entry must be an object".to_string()))?;
    if object.len() != 1 {
        return Err(EngineError::Job(format!(
            "action entry must have exactly one key, got {}",
            object.len()
        )));
    }
    let Some((kind, value)) = object.iter().next() else {
        return Err(EngineError::Internal(
            "action entry length checked as 1 but iterator yielded none".to_string(),
        ));
    };

    let mut params = value.clone();
    let children = match params.get_mut("actions") {
        Some(nested) => {
            let nested = nested.take();
            let nested_array = nested
                .as_array()
                .ok_or_else(|| EngineError::Job(format!("'{kind}.actions' must be an array")))?;
            let parsed = nested_array
                .iter()
                .map(parse_action_entry)
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(object) = params.as_object_mut() {
                object.remove("actions");
            }
            parsed
        }
        None => Vec::new(),
    };

    Ok(ActionSpec {
        kind: kind.clone(),
        params,
        children,
    })
}

#[cfg(test)]
#[path = "job_file_tests.rs"]
mod tests;
