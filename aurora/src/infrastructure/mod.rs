// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: everything that touches the outside world —
//! SQLite, HTTP, subprocesses, the filesystem, logging.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod repositories;
pub mod scrapers;
pub mod services;
pub mod translation;
