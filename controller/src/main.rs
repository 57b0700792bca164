// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `sfc-controller`: the process entry point (§6). Loads a declarative
//! config document, seeds an [`engine::Engine`] with its system parameters,
//! runs one reconcile cycle, and optionally writes out the resulting store
//! snapshot.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod cli;
mod config;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use engine::Engine;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ConfigError;

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("failed to write snapshot to {path}: {source}")]
    SnapshotWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    SnapshotEncode(#[from] serde_yaml_ng::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "reconcile cycle failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tracing::instrument(skip_all, fields(config = %cli.config.display()))]
fn run(cli: &Cli) -> Result<(), RunError> {
    let config = config::load(&cli.config)?;

    let mut engine = Engine::new();
    engine.set_system_parameters(config.system_parameters);
    let (report, errors) = engine.reconcile(config.desired)?;

    tracing::info!(puts = report.puts, deletes = report.deletes, "reconcile cycle complete");
    for err in &errors {
        tracing::warn!(error = %err, "one SFC failed to wire and was skipped");
    }

    if let Some(out_path) = &cli.snapshot_out {
        write_snapshot(&engine, out_path)?;
    }

    Ok(())
}

fn write_snapshot(engine: &Engine, path: &Path) -> Result<(), RunError> {
    let snapshot = engine.store().live_snapshot()?;
    let yaml = serde_yaml_ng::to_string(&snapshot)?;
    std::fs::write(path, yaml).map_err(|source| RunError::SnapshotWrite {
        path: path.display().to_string(),
        source,
    })
}
