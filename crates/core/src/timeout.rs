// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout values: parsing from a duration spec, clamping, protection, and
//! scoped enforcement of an action's wall-clock budget.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Fallback duration for a timeout that names no explicit value anywhere in
/// the job, device descriptor, or action constructor.
pub const DEFAULT_DURATION_SECONDS: u64 = 300;

/// Maximum duration a timeout may be set to via job input. Durations set by
/// the owning action's constructor default or by the device descriptor are
/// not bound by this clamp.
pub const CLAMP_SECONDS: u64 = 24 * 60 * 60;

/// `{days?, hours?, minutes?, seconds?}`, as it appears in job or device
/// descriptor documents. Any subset of fields may be present; absent fields
/// contribute zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSpec {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl TimeoutSpec {
    /// Sum the fields into a duration in seconds.
    pub fn parse(&self) -> u64 {
        self.seconds + self.minutes * 60 + self.hours * 3600 + self.days * 86400
    }
}

/// Who is attempting to set a timeout's duration.
///
/// The job-input clamp only applies when the caller is job input; device
/// descriptor values and an action's own constructor default are trusted to
/// set durations outside `[1, CLAMP_SECONDS]` deliberately (e.g. a multi-hour
/// flash step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutSource {
    JobInput,
    DeviceDescriptor,
    ActionDefault,
}

/// A named, possibly protected, wall-clock budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeout {
    pub name: String,
    pub duration_seconds: u64,
    pub protected: bool,
}

impl Timeout {
    /// Construct a timeout with the default duration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration_seconds: DEFAULT_DURATION_SECONDS,
            protected: false,
        }
    }

    /// Construct a protected timeout (job input may never modify it).
    pub fn protected(name: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
            protected: true,
        }
    }

    /// Set the duration from a parsed spec, applying the job-input clamp only
    /// when `source` is [`TimeoutSource::JobInput`].
    ///
    /// Fails with [`EngineError::ProtectedTimeout`] if this timeout is
    /// protected and `source` is [`TimeoutSource::JobInput`]; device and
    /// action-default sources are never blocked by protection, matching the
    /// invariant that only job-input overrides are fenced off.
    pub fn modify(&mut self, seconds: u64, source: TimeoutSource) -> Result<(), EngineError> {
        if self.protected && source == TimeoutSource::JobInput {
            return Err(EngineError::ProtectedTimeout(self.name.clone()));
        }
        self.duration_seconds = match source {
            TimeoutSource::JobInput => seconds.clamp(1, CLAMP_SECONDS),
            TimeoutSource::DeviceDescriptor | TimeoutSource::ActionDefault => seconds.max(1),
        };
        Ok(())
    }

    /// This timeout's duration as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    /// Run `fut` to completion, or fail with [`EngineError::JobTimeout`] if it
    /// does not finish within `duration_seconds`.
    ///
    /// Built on the async runtime's own timeout primitive (wrapping the
    /// future) rather than a background thread or OS alarm signal, so it
    /// composes cleanly with nested pipelines and releases on every exit path
    /// — normal completion, an error returned by `fut`, or the future being
    /// dropped when an outer scope cancels.
    pub async fn scoped<F, T>(&self, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = T>,
    {
        match tokio::time::timeout(self.duration(), fut).await {
            Ok(value) => Ok(value),
            Err(_elapsed) => Err(EngineError::JobTimeout {
                name: self.name.clone(),
                duration_seconds: self.duration_seconds,
            }),
        }
    }
}

#[cfg(test)]
#[path = "timeout_tests.rs"]
mod tests;
