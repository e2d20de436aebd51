// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Aurora Domain
//!
//! The aurora domain crate holds the core business logic of the AV library
//! pipeline: movies identified by an AV code, videos identified by a content
//! fingerprint, their per-stage processing status, the bilingual metadata
//! graph, and the translation result types shared by every strategy and
//! provider. It follows Domain-Driven Design conventions and is completely
//! independent of databases, HTTP clients, and subprocess tooling.
//!
//! ## Module Structure
//!
//! - [`entities`] — objects with identity: `Movie`, `Video`,
//!   `EntityStageStatus`, `Metadata`, `Actor`, `Term`, `Glossary`
//! - [`value_objects`] — immutable self-validating values: `AvCode`,
//!   `Fingerprint`, `VideoStage`
//! - [`subtitle`] — the SRT cue grammar: parsing, renumbering, block
//!   splitting, and adaptive slicing
//! - [`services`] — ports implemented by the infrastructure layer:
//!   `Provider`, `WebScraper`, audio adapters, plus the task/result types
//!   that cross those boundaries
//! - [`repositories`] — the `Manifest` persistence port
//! - [`error`] — the `AuroraError` hierarchy and the provider error taxonomy
//!
//! ## Business Rules and Invariants
//!
//! - A movie is uniquely identified by `(label, number)`; anonymous movies
//!   carry `label == "UNKNOWN"` and a 64-hex fingerprint as their number,
//!   standard movies carry an all-digit number.
//! - A video's fingerprint is the SHA-256 of a 1 MiB sample read from the
//!   file center; it is the stable identity across moves and renames.
//! - Stage rows for a video form a subset of the fixed stage order with at
//!   most one row per stage.
//! - A provider's availability is monotonic within a process: once tripped,
//!   the circuit breaker never closes again.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod subtitle;
pub mod value_objects;

// Re-export commonly used types for convenient access
pub use entities::{
    Actor, BilingualList, BilingualText, CategorySet, EntityStageStatus, Gender, Glossary,
    Metadata, Movie, StageStatus, Term, Video,
};
pub use error::{AuroraError, ChatErrorKind};
pub use services::{ChatResult, ProcessResult, TaskType, TranslateContext};
pub use value_objects::{AvCode, Fingerprint, VideoStage};
