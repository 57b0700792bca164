// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command-line entry point (§6/§7): selects a config file, an optional
//! snapshot output path, and a log filter.

use std::path::PathBuf;

use clap::Parser;

/// Run one reconcile cycle against a declarative config file.
#[derive(Debug, Parser)]
#[command(name = "sfc-controller", version, about)]
pub struct Cli {
    /// Path to the YAML config file (system parameters, hosts, externals, SFCs).
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Write the resulting store snapshot (YAML) to this path after reconciling.
    #[arg(short, long, value_name = "FILE")]
    pub snapshot_out: Option<PathBuf>,

    /// Log filter, in `tracing_subscriber::EnvFilter` syntax. Overridden by
    /// `RUST_LOG` when set.
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
