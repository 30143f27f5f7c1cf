// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The pipeline execution engine: the recursive action tree, its
//! construction and parameter resolution, the hierarchical timeout and
//! cancellation model, the error/retry/diagnostic/cleanup state machine, and
//! the shared job context actions use to exchange data and connections.
//!
//! Concrete action strategies, the YAML job parser, the device descriptor
//! loader, the connection layer, protocol plugins, and result sinks are
//! external collaborators this crate drives through traits, not things it
//! implements.

mod action;
mod builtin;
mod cancellation;
mod connection;
mod executor;
mod job;
mod level;
mod pipeline;
mod registry;
mod retry_action;

pub use action::{
    build_result_record, call_protocols, log_action_results, run_command, Action, ActionState,
    CommandOutcome,
};
pub use builtin::{register_builtins, FinalizeAction};
pub use cancellation::CancelToken;
pub use connection::{Connection, ConnectionHandle, Protocol, RawHandle};
pub use executor::{exit_code, job_timeout_from_spec, ActionSpec, Executor};
pub use job::{Job, TimeoutKind};
pub use level::Level;
pub use pipeline::Pipeline;
pub use registry::{Registry, Strategy};
pub use retry_action::RetryAction;
