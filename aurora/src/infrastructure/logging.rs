// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Setup
//!
//! Two tracing layers: a console layer honouring `RUST_LOG` (defaulting to
//! `info`, or `debug` with `--verbose`), and a non-blocking file layer
//! writing one log file per day under the configured log directory
//! (`aurora.log.YYYY-MM-DD`). Stage code logs with structured fields —
//! movie code, filename, stage name — so a day's file reconstructs a run.
//!
//! The returned guard must stay alive for the duration of the process;
//! dropping it flushes and closes the file writer.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use aurora_domain::error::AuroraError;

/// Initializes console + daily-file logging; keep the guard alive.
pub fn init_logging(log_dir: &Path, verbose: bool) -> Result<WorkerGuard, AuroraError> {
    std::fs::create_dir_all(log_dir)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = tracing_appender::rolling::daily(log_dir, "aurora.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|err| AuroraError::InternalError(format!("Logging init failed: {}", err)))?;

    Ok(guard)
}
