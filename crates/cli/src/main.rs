// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The `rigpipe` harness binary (§4.10): accepts an already-parsed job tree
//! and device descriptor as JSON files plus a handful of flags, builds the
//! strategy registry, constructs the executor, runs it to completion, prints
//! a final summary line, and returns the process exit code.

mod config;
mod job_file;

use anyhow::{Context as _, Result};
use clap::Parser;
use config::{Config, ConfigOverrides, LogFormat};
use rigpipe_engine::{register_builtins, Executor, Job, Registry};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rigpipe", about = "Runs a validation job tree against a device under test")]
struct Cli {
    /// Path to the parsed job tree document (§6).
    job: PathBuf,

    /// Path to the device descriptor document (§6).
    device: PathBuf,

    /// Print the full action tree after the run, not just the summary line.
    #[arg(short, long)]
    verbose: bool,

    /// Log line format: "pretty" or "json".
    #[arg(long)]
    log_format: Option<String>,

    /// Override the resolved state directory.
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(ConfigOverrides {
        job_path: cli.job,
        device_path: cli.device,
        verbose: cli.verbose,
        log_format: cli.log_format,
        state_dir: cli.state_dir,
    });

    install_subscriber(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let (result, summary) = runtime.block_on(run(&config))?;

    println!("{summary}");
    std::process::exit(rigpipe_engine::exit_code(&result));
}

fn install_subscriber(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

/// Load the job and device documents, build the registry and job, run the
/// executor to completion, and render the final summary line.
async fn run(config: &Config) -> Result<(Result<(), rigpipe_core::EngineError>, String)> {
    let job_doc = read_json(&config.job_path)?;
    let device_doc = read_json(&config.device_path)?;

    let parsed = job_file::parse_job_document(&job_doc).context("invalid job document")?;
    let (device_action_timeouts, device_connection_timeouts) =
        job_file::parse_device_timeouts(&device_doc).context("invalid device descriptor")?;

    let job_timeout = rigpipe_engine::job_timeout_from_spec(parsed.job_timeout)
        .context("invalid job timeout")?;

    let mut job = Job::new(device_doc, job_timeout);
    for (name, spec) in parsed.action_timeouts {
        job.set_job_action_timeout(name, spec);
    }
    for (name, spec) in parsed.connection_timeouts {
        job.set_job_connection_timeout(name, spec);
    }
    for (name, spec) in device_action_timeouts {
        job.set_device_action_timeout(name, spec);
    }
    for (name, spec) in device_connection_timeouts {
        job.set_device_connection_timeout(name, spec);
    }

    let mut registry = Registry::new();
    register_builtins(&mut registry);

    let mut executor = Executor::build(job, &registry, &parsed.actions)
        .context("failed to build the action tree")?;

    let result = executor.run().await;

    let summary = match &result {
        Ok(()) => format!("job '{}' completed successfully", parsed.job_name),
        Err(err) => format!("job '{}' failed: {err}", parsed.job_name),
    };

    let summary = if config.verbose {
        let tree = executor.describe(true);
        format!("{summary}\n{}", serde_json::to_string_pretty(&tree)?)
    } else {
        summary
    };

    Ok((result, summary))
}

fn read_json(path: &PathBuf) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse '{}' as JSON", path.display()))
}
