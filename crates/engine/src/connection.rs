// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external connection and protocol contracts (§6).
//!
//! Concrete connections (interactive sub-process with pattern-match I/O) and
//! protocol plugins (multi-node coordination, …) are out of this crate's
//! scope — they are collaborators the engine drives through these traits.

use async_trait::async_trait;
use rigpipe_core::{EngineError, Timeout};
use std::time::Duration;

/// An opaque, linear handle to a link with the device under test.
///
/// At most one action owns a `ConnectionHandle` at a time; ownership
/// transfers from action to action via the return value of
/// [`crate::action::Action::run`].
pub type ConnectionHandle = Box<dyn Connection>;

/// Minimal send/expect interface a concrete connection must implement.
#[async_trait]
pub trait Connection: Send {
    /// Whether the underlying link is currently established.
    fn connected(&self) -> bool;

    /// The prompt pattern(s) `expect` matches against.
    fn prompt_str(&self) -> &[String];

    /// Replace the prompt pattern(s).
    fn set_prompt_str(&mut self, patterns: Vec<String>);

    /// The per-interaction timeout currently attached to this connection.
    fn timeout(&self) -> Duration;

    /// Attach a new per-interaction timeout (set from the owning action's
    /// `connection_timeout`).
    fn set_timeout(&mut self, timeout: Duration);

    /// Block until the link is ready to accept input.
    async fn wait(&mut self) -> Result<(), EngineError>;

    /// Send a line of input, optionally after a delay between characters.
    async fn sendline(&mut self, line: &str, delay: Option<Duration>) -> Result<(), EngineError>;

    /// Send a control character (e.g. Ctrl-C).
    async fn sendcontrol(&mut self, c: char) -> Result<(), EngineError>;

    /// Wait for one of `patterns` to appear, returning the matched index.
    async fn expect(
        &mut self,
        patterns: &[String],
        timeout: Duration,
    ) -> Result<usize, EngineError>;

    /// Yield a scoped raw handle for low-level use; released when dropped.
    fn test_connection(&mut self) -> Box<dyn RawHandle + '_>;
}

/// A scoped raw handle obtained from [`Connection::test_connection`].
pub trait RawHandle: Send {}

/// An external plugin callable from an action for cross-job coordination.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// The protocol's name, used to key `common/<name>/<key>` data and to
    /// match against the `protocols` list in an action's parameters.
    fn name(&self) -> &str;

    /// Invoke the protocol with a normalized call descriptor, returning its
    /// reply.
    async fn call(&self, descriptor: &serde_json::Value) -> Result<serde_json::Value, EngineError>;

    /// Extract a `(key, value)` pair to store under `common/<name>/<key>`
    /// from a reply, or `None` if this reply contributes nothing.
    fn collate(
        &self,
        reply: &serde_json::Value,
        descriptor: &serde_json::Value,
    ) -> Option<(String, serde_json::Value)>;

    /// Validate the descriptor's embedded timeout against the action's
    /// connection timeout.
    fn check_timeout(
        &self,
        connection_timeout: &Timeout,
        descriptor: &serde_json::Value,
    ) -> Result<(), EngineError>;
}
