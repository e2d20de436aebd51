// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! One command, three knobs: the directory to scan, the config file, and
//! verbosity. Everything else — providers, scrapers, directories — lives
//! in the YAML configuration tree.

use std::path::PathBuf;

use clap::Parser;

/// Scan a directory of videos and drive the subtitle pipeline.
#[derive(Debug, Parser)]
#[command(name = "aurora", version, about)]
pub struct Cli {
    /// Directory to scan for video files
    pub root: PathBuf,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "aurora.yaml")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses the process arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
