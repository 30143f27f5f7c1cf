// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration for the harness binary (§4.9): command-line flags
//! take precedence over environment variables, which take precedence over
//! fixed defaults. Resolves a state directory once and derives well-known
//! paths underneath it, exposed as a plain struct rather than scattered
//! `env::var` calls.

use std::path::PathBuf;

/// How the installed `tracing` subscriber renders log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved configuration for one harness invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub job_path: PathBuf,
    pub device_path: PathBuf,
    pub verbose: bool,
    pub log_format: LogFormat,
    pub state_dir: PathBuf,
}

/// The subset of CLI flags that can override configuration, decoupled from
/// `clap`'s `Cli` struct so resolution is testable without parsing argv.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub job_path: PathBuf,
    pub device_path: PathBuf,
    pub verbose: bool,
    pub log_format: Option<String>,
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Resolve final configuration: CLI flags first, then `RIGPIPE_*`
    /// environment variables, then fixed defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let log_format = overrides
            .log_format
            .as_deref()
            .and_then(LogFormat::parse)
            .or_else(|| {
                std::env::var("RIGPIPE_LOG_FORMAT")
                    .ok()
                    .as_deref()
                    .and_then(LogFormat::parse)
            })
            .unwrap_or(LogFormat::Pretty);

        let state_dir = overrides
            .state_dir
            .or_else(default_state_dir_from_env)
            .unwrap_or_else(default_state_dir_fallback);

        Self {
            job_path: overrides.job_path,
            device_path: overrides.device_path,
            verbose: overrides.verbose,
            log_format,
            state_dir,
        }
    }
}

/// `RIGPIPE_STATE_DIR` > `XDG_STATE_HOME/rigpipe`, matching the resolution
/// order used for the daemon's own state directory in this lineage.
fn default_state_dir_from_env() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("RIGPIPE_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("rigpipe"));
    }
    None
}

fn default_state_dir_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".local/state/rigpipe"))
        .unwrap_or_else(|_| PathBuf::from(".rigpipe-state"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
