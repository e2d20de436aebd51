// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manifest Port
//!
//! The [`Manifest`] owns all persistent state: movies, videos, per-stage
//! status rows, the bilingual entity tables, glossary terms. Every other
//! component receives `Movie` / `Video` values as transient views, mutates
//! them in memory, and flushes changes back through this interface.
//!
//! ## Transaction discipline
//!
//! The pipeline opens one transaction per movie-processing session with
//! [`Manifest::begin_transaction`]; every operation issued while it is open
//! joins it, and the engine commits or rolls back at the end of the movie.
//! With no open transaction, operations are individually atomic. Stage and
//! path writes never delete by-product files — file cleanup belongs to the
//! reconciliation kernel, not the store.
//!
//! ## Entity cache
//!
//! [`Manifest::get_entity`] doubles as the translation cache: DIRECTOR,
//! STUDIO, CATEGORY and ACTOR lookups are global by original text, while
//! TITLE and SYNOPSIS are movie-scoped columns queried by their original
//! text. A hit means the scrape stage skips the orchestrator entirely.

use std::path::Path;

use async_trait::async_trait;

use crate::entities::{Glossary, Metadata, Movie, Video};
use crate::error::AuroraError;
use crate::value_objects::{AvCode, Fingerprint};

/// Cache-lookup entity kinds for [`Manifest::get_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Director,
    Studio,
    Category,
    Actor,
    Title,
    Synopsis,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Director => "director",
            EntityKind::Studio => "studio",
            EntityKind::Category => "category",
            EntityKind::Actor => "actor",
            EntityKind::Title => "title",
            EntityKind::Synopsis => "synopsis",
        }
    }
}

/// Durable storage and transactional API for all pipeline state.
#[async_trait]
pub trait Manifest: Send + Sync {
    // ========== Transactions ==========

    /// Opens the movie-session transaction.
    ///
    /// # Errors
    ///
    /// `DatabaseError` when a transaction is already open.
    async fn begin_transaction(&self) -> Result<(), AuroraError>;

    /// Commits the open transaction; no-op when none is open.
    async fn commit_transaction(&self) -> Result<(), AuroraError>;

    /// Rolls back the open transaction; no-op when none is open.
    async fn rollback_transaction(&self) -> Result<(), AuroraError>;

    // ========== Movies ==========

    /// Finds a standard movie by identity, or creates it.
    async fn get_or_create_standard_movie(
        &self,
        label: &str,
        number: &str,
    ) -> Result<Movie, AuroraError>;

    /// Finds the anonymous movie for a fingerprint, or creates it.
    ///
    /// The identity stays pinned to this fingerprint even when further
    /// videos are later attached to the movie.
    async fn get_or_create_anonymous_movie(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Movie, AuroraError>;

    /// Loads a fully hydrated movie (metadata, terms, videos with stage
    /// rows), or None.
    async fn get_movie(&self, code: &AvCode) -> Result<Option<Movie>, AuroraError>;

    /// Upserts the movie row and its videos plus ownership links; idempotent.
    async fn register_movie(&self, movie: &Movie) -> Result<(), AuroraError>;

    /// Replaces the movie's scalar metadata, rewrites its M:N links
    /// (categories, actors, actresses) with actor-identity consolidation,
    /// and rewrites its glossary terms.
    async fn update_movie(&self, movie: &Movie) -> Result<(), AuroraError>;

    /// Rewrites the movie's term list (delete + insert).
    async fn update_terms(&self, movie: &Movie) -> Result<(), AuroraError>;

    // ========== Glossary ==========

    /// Promotes the movie's terms into the cross-movie glossary catalog and
    /// records one hit per term; idempotent. An entry keeps the translation
    /// the first contributing movie established; later movies only add hit
    /// records.
    async fn promote_terms_to_glossary(&self, movie: &Movie) -> Result<(), AuroraError>;

    /// Glossary entries observed in a movie, via its hit records.
    async fn get_glossary_hits(&self, movie: &Movie) -> Result<Vec<Glossary>, AuroraError>;

    // ========== Metadata cache ==========

    /// Full bilingual metadata graph for a movie, or None when nothing was
    /// scraped yet.
    async fn get_metadata(&self, code: &AvCode) -> Result<Option<Metadata>, AuroraError>;

    /// Cached translation lookup by original text; see the module docs for
    /// the keying rules per kind.
    async fn get_entity(
        &self,
        kind: EntityKind,
        original: &str,
    ) -> Result<Option<String>, AuroraError>;

    // ========== Videos ==========

    /// Finds a video by content fingerprint, stage rows included.
    async fn find_video(&self, fingerprint: &Fingerprint) -> Result<Option<Video>, AuroraError>;

    /// Shallow movie (identity only) owning a video; None for orphans.
    async fn find_movie_of_video(&self, video: &Video) -> Result<Option<Movie>, AuroraError>;

    /// Inserts or updates a video row keyed by fingerprint.
    async fn save_video(&self, video: &Video) -> Result<(), AuroraError>;

    /// Persists a rename/move: path and filename change, identity does not.
    async fn update_video_location(
        &self,
        video: &Video,
        new_path: &Path,
    ) -> Result<(), AuroraError>;

    /// Writes the video's stage rows (status + by-product path).
    async fn update_video(&self, video: &Video) -> Result<(), AuroraError>;

    /// Loads persisted stage rows into the in-memory video, materializing
    /// PENDING entries for stages with no row. The cascade-reset decision
    /// stays with the pipeline's reconciliation kernel.
    async fn load_video_state(&self, video: &mut Video) -> Result<(), AuroraError>;
}
