// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Aurora
//!
//! Resumable AV library pipeline. Given a directory of video files, aurora
//! identifies each movie by its AV code, scrapes and translates its
//! bilingual metadata, and carries every video through a fixed stage
//! sequence — extract audio, denoise, transcribe, correct, translate,
//! render a bilingual ASS asset — with all state persisted in a SQLite
//! manifest so an interrupted run resumes exactly where it stopped.
//!
//! ## Layers
//!
//! - [`application`] — the pipeline engine, the library scanner, and the
//!   stage implementations
//! - [`infrastructure`] — SQLite manifest, web scrapers, LLM providers and
//!   strategies, subprocess adapters, configuration and logging
//!
//! Domain types (movies, videos, stage status, the SRT grammar, service
//! ports) live in the `aurora-domain` crate; launch plumbing (CLI,
//! shutdown, exit codes) in `aurora-bootstrap`.

pub mod application;
pub mod infrastructure;
