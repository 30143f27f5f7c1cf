// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error taxonomy actions and the engine raise.
//!
//! [`EngineError`] is a sum type rather than a single catch-all so retry
//! wrappers and the root pipeline can pattern-match on the category instead
//! of inspecting a message string.

use thiserror::Error;

/// A single category from the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Job,
    Infrastructure,
    Test,
    JobTimeout,
    ProtectedTimeout,
    Internal,
    Cancelled,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Job => "job",
            ErrorCategory::Infrastructure => "infrastructure",
            ErrorCategory::Test => "test",
            ErrorCategory::JobTimeout => "job-timeout",
            ErrorCategory::ProtectedTimeout => "protected-timeout",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Errors raised by actions and the engine.
///
/// Recovery rules (see the pipeline's `run_actions`):
/// - [`EngineError::Job`] and [`EngineError::Infrastructure`] are domain errors:
///   a [`crate::timeout`]-bounded retry wrapper may absorb them; otherwise they
///   escalate to the root after cleanup and diagnostics.
/// - [`EngineError::Test`] is a soft failure, logged and cleared by the action
///   that raised it; it never escalates on its own.
/// - [`EngineError::JobTimeout`] is raised by the engine when the job-global
///   deadline elapses between actions.
/// - [`EngineError::ProtectedTimeout`] is raised by `Timeout::modify` when job
///   input attempts to change a protected timeout.
/// - [`EngineError::Internal`] marks a bug: any error surfacing from an
///   action's `run` that isn't one of the above is wrapped here and is never
///   retried.
/// - [`EngineError::Cancelled`] is not part of the source taxonomy; it gives
///   the cooperative INT/TERM cancellation path (§5) an explicit variant to
///   carry through `Action::run`'s fixed `Result<_, EngineError>` signature
///   instead of overloading `Internal`. Never retried, same as `JobTimeout`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job error: {0}")]
    Job(String),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    #[error("test error: {0}")]
    Test(String),

    #[error("job '{name}' timed out after {duration_seconds} seconds")]
    JobTimeout { name: String, duration_seconds: u64 },

    #[error("timeout '{0}' is protected and cannot be modified by job input")]
    ProtectedTimeout(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    /// The taxonomy category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Job(_) => ErrorCategory::Job,
            EngineError::Infrastructure(_) => ErrorCategory::Infrastructure,
            EngineError::Test(_) => ErrorCategory::Test,
            EngineError::JobTimeout { .. } => ErrorCategory::JobTimeout,
            EngineError::ProtectedTimeout(_) => ErrorCategory::ProtectedTimeout,
            EngineError::Internal(_) => ErrorCategory::Internal,
            EngineError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// True for the two domain-error categories a retry wrapper may absorb.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Job | ErrorCategory::Infrastructure
        )
    }

    /// True for categories that must never be retried by a `RetryAction`,
    /// regardless of attempts remaining.
    pub fn is_fatal_to_retry(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::JobTimeout | ErrorCategory::Internal | ErrorCategory::Cancelled
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
