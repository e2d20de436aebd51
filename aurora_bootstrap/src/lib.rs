// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Aurora Bootstrap
//!
//! The thin launch layer: command-line parsing, graceful-shutdown
//! coordination, and process exit codes. Nothing here knows about movies
//! or manifests — the application crate wires these pieces to the real
//! services.

pub mod cli;
pub mod exit_code;
pub mod shutdown;

pub use cli::{parse_cli, Cli};
pub use exit_code::ExitCode;
pub use shutdown::{ShutdownCoordinator, ShutdownToken};
