// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Manifest Implementation
//!
//! [`SqliteManifest`] implements the domain [`Manifest`] port over a single
//! SQLite database. All pipeline state lives here: movies keyed by
//! `(label, number)`, videos keyed by content fingerprint, one stage row
//! per `(video, stage)`, the bilingual entity tables that double as the
//! translation cache, the actor arena with its alias table, and per-movie
//! glossary terms.
//!
//! ## Transaction model
//!
//! The pipeline opens one transaction per movie with `begin_transaction`;
//! while it is open, every operation joins it through the held connection.
//! Without an open transaction each operation acquires a pool connection
//! and is individually atomic. The transaction sits behind a
//! `tokio::sync::Mutex` — the engine is single-threaded per movie, the
//! mutex only serializes access from concurrent movie runs sharing one
//! manifest. An uncommitted transaction rolls back on drop, which covers
//! cancellation mid-movie.
//!
//! ## Actor identity consolidation
//!
//! Scraped actors arrive as alias bundles without database identity. On
//! `update_movie`, each incoming actor's aliases are scanned in order
//! against `actor_names`; the first alias already registered yields the
//! existing `actor_id`, otherwise a fresh UUID is allocated. All aliases
//! are then upserted under that id and the `act_in` link is rewritten.
//! A performer renamed between releases keeps one identity as long as any
//! alias has been seen before.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use aurora_domain::entities::{
    Actor, BilingualText, CategorySet, EntityStageStatus, Gender, Glossary, GlossaryHit, Metadata,
    Movie, StageStatus, Term, Video,
};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::{EntityKind, Manifest};
use aurora_domain::value_objects::{AvCode, Fingerprint, VideoStage};

/// Maps sqlx failures onto the domain error category.
fn db_err(err: sqlx::Error) -> AuroraError {
    AuroraError::DatabaseError(err.to_string())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn parse_uuid(s: &str) -> Result<Uuid, AuroraError> {
    Uuid::parse_str(s).map_err(|e| AuroraError::DatabaseError(format!("Bad UUID '{}': {}", s, e)))
}

/// Dispatches one `*_on` operation onto the open transaction, or onto a
/// fresh pool connection when no movie session is active.
macro_rules! on_conn {
    ($self:ident, $op:ident ( $($arg:expr),* )) => {{
        let mut guard = $self.tx.lock().await;
        match guard.as_mut() {
            Some(tx) => Self::$op(&mut *tx, $($arg),*).await,
            None => {
                let mut conn = $self.pool.acquire().await.map_err(db_err)?;
                Self::$op(&mut conn, $($arg),*).await
            }
        }
    }};
}

/// SQLite-backed manifest.
pub struct SqliteManifest {
    pool: SqlitePool,
    tx: Mutex<Option<Transaction<'static, Sqlite>>>,
}

impl SqliteManifest {
    /// Wraps an already-migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tx: Mutex::new(None),
        }
    }

    // ========== Row hydration ==========

    async fn video_from_row(
        conn: &mut SqliteConnection,
        row: &SqliteRow,
    ) -> Result<Video, AuroraError> {
        let id = parse_uuid(&row.get::<String, _>("id"))?;
        let movie_id = row
            .get::<Option<String>, _>("movie_id")
            .map(|s| parse_uuid(&s))
            .transpose()?;
        let fingerprint = Fingerprint::new(&row.get::<String, _>("sha256"))?;

        let mut video = Video {
            id,
            movie_id,
            fingerprint,
            filename: row.get("filename"),
            suffix: row.get("suffix"),
            absolute_path: row.get::<String, _>("absolute_path").into(),
            stages: Default::default(),
        };
        Self::load_stage_rows(conn, &mut video).await?;
        Ok(video)
    }

    async fn load_stage_rows(
        conn: &mut SqliteConnection,
        video: &mut Video,
    ) -> Result<(), AuroraError> {
        let rows = sqlx::query(
            "SELECT id, stage_name, status, by_product_path FROM video_stage_statuses WHERE video_id = ?",
        )
        .bind(video.id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;

        video.stages.clear();
        for row in rows {
            let stage: VideoStage = row.get::<String, _>("stage_name").parse()?;
            let status: StageStatus = row.get::<String, _>("status").parse()?;
            let by_product_path = row
                .get::<Option<String>, _>("by_product_path")
                .map(Into::into);
            video.stages.insert(
                stage,
                EntityStageStatus {
                    id: parse_uuid(&row.get::<String, _>("id"))?,
                    stage,
                    status,
                    by_product_path,
                },
            );
        }
        // Materialize PENDING rows for stages never written yet.
        for stage in VideoStage::ORDER {
            video
                .stages
                .entry(stage)
                .or_insert_with(|| EntityStageStatus::pending(stage));
        }
        Ok(())
    }

    async fn movie_row_by_code(
        conn: &mut SqliteConnection,
        code: &AvCode,
    ) -> Result<Option<SqliteRow>, AuroraError> {
        sqlx::query("SELECT * FROM movies WHERE label = ? AND number = ?")
            .bind(code.label())
            .bind(code.number())
            .fetch_optional(conn)
            .await
            .map_err(db_err)
    }

    async fn bilingual_by_id(
        conn: &mut SqliteConnection,
        table: &str,
        id: &str,
    ) -> Result<Option<BilingualText>, AuroraError> {
        let query = format!("SELECT jap_text, sch_text FROM {} WHERE id = ?", table);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| BilingualText {
            original: r.get("jap_text"),
            translated: r.get("sch_text"),
        }))
    }

    async fn metadata_for_row(
        conn: &mut SqliteConnection,
        movie_row: &SqliteRow,
    ) -> Result<Option<Metadata>, AuroraError> {
        let movie_id: String = movie_row.get("id");
        let title_ja: Option<String> = movie_row.get("title_ja");
        let director_id: Option<String> = movie_row.get("director_id");
        let studio_id: Option<String> = movie_row.get("studio_id");

        // A movie row exists before scraping; an empty graph means "not yet".
        if title_ja.is_none() && director_id.is_none() && studio_id.is_none() {
            return Ok(None);
        }

        let mut metadata = Metadata::default();

        if let Some(title_ja) = title_ja {
            metadata.title = Some(BilingualText {
                original: title_ja,
                translated: movie_row.get("title_zh"),
            });
        }
        metadata.release_date = movie_row.get("release_date");
        if let Some(synopsis_ja) = movie_row.get::<Option<String>, _>("synopsis_ja") {
            metadata.synopsis = Some(BilingualText {
                original: synopsis_ja,
                translated: movie_row.get("synopsis_zh"),
            });
        }
        if let Some(id) = director_id {
            metadata.director = Self::bilingual_by_id(conn, "directors", &id).await?;
        }
        if let Some(id) = studio_id {
            metadata.studio = Self::bilingual_by_id(conn, "studios", &id).await?;
        }

        // Categories come back item-wise: the store keeps one row per tag.
        let rows = sqlx::query(
            "SELECT c.jap_text, c.sch_text
             FROM is_a_movie_of m JOIN categories c ON m.category_id = c.id
             WHERE m.movie_id = ?",
        )
        .bind(&movie_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;
        if !rows.is_empty() {
            metadata.categories = Some(CategorySet::ItemWise(
                rows.iter()
                    .map(|r| BilingualText {
                        original: r.get("jap_text"),
                        translated: r.get("sch_text"),
                    })
                    .collect(),
            ));
        }

        // Actors grouped by arena id, aliases attached.
        let rows = sqlx::query(
            "SELECT a.id AS actor_id, a.current_name, a.gender, n.jap_text, n.sch_text
             FROM act_in ai
             JOIN actors a ON ai.actor_id = a.id
             LEFT JOIN actor_names n ON n.actor_id = a.id
             WHERE ai.movie_id = ?
             ORDER BY a.id",
        )
        .bind(&movie_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;

        let mut current: Option<(String, Gender, Actor)> = None;
        fn flush(metadata: &mut Metadata, entry: Option<(String, Gender, Actor)>) {
            if let Some((_, gender, actor)) = entry {
                match gender {
                    Gender::Male => metadata.actors.push(actor),
                    Gender::Female => metadata.actresses.push(actor),
                }
            }
        }
        for row in rows {
            let actor_id: String = row.get("actor_id");
            let gender: Gender = row.get::<String, _>("gender").parse()?;
            if current
                .as_ref()
                .map(|(id, _, _)| id != &actor_id)
                .unwrap_or(true)
            {
                flush(&mut metadata, current.take());
                current = Some((
                    actor_id,
                    gender,
                    Actor {
                        current_name: row.get("current_name"),
                        names: Vec::new(),
                    },
                ));
            }
            if let Some(jap_text) = row.get::<Option<String>, _>("jap_text") {
                if let Some((_, _, actor)) = current.as_mut() {
                    actor.names.push(BilingualText {
                        original: jap_text,
                        translated: row.get("sch_text"),
                    });
                }
            }
        }
        flush(&mut metadata, current.take());

        Ok(Some(metadata))
    }

    // ========== Write helpers ==========

    /// Upserts a bilingual entity by `jap_text`, returning its id.
    ///
    /// A provided translation overwrites; an absent one never erases an
    /// existing translation.
    async fn upsert_bilingual(
        conn: &mut SqliteConnection,
        table: &str,
        text: &BilingualText,
    ) -> Result<String, AuroraError> {
        let now = now_rfc3339();
        let query = format!(
            "INSERT INTO {table} (id, jap_text, sch_text, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(jap_text) DO UPDATE SET
                 sch_text = COALESCE(excluded.sch_text, {table}.sch_text),
                 updated_at = excluded.updated_at",
            table = table
        );
        sqlx::query(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(&text.original)
            .bind(&text.translated)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

        let query = format!("SELECT id FROM {} WHERE jap_text = ?", table);
        let row = sqlx::query(&query)
            .bind(&text.original)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;
        Ok(row.get("id"))
    }

    /// First alias already registered wins; otherwise a fresh UUID.
    async fn resolve_actor_id(
        conn: &mut SqliteConnection,
        actor: &Actor,
    ) -> Result<String, AuroraError> {
        for name in &actor.names {
            let row = sqlx::query("SELECT actor_id FROM actor_names WHERE jap_text = ?")
                .bind(&name.original)
                .fetch_optional(&mut *conn)
                .await
                .map_err(db_err)?;
            if let Some(row) = row {
                return Ok(row.get("actor_id"));
            }
        }
        Ok(Uuid::new_v4().to_string())
    }

    async fn write_actors(
        conn: &mut SqliteConnection,
        movie_id: &str,
        actors: &[Actor],
        gender: Gender,
    ) -> Result<(), AuroraError> {
        let now = now_rfc3339();
        for actor in actors {
            let actor_id = Self::resolve_actor_id(conn, actor).await?;

            sqlx::query(
                "INSERT INTO actors (id, current_name, gender, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                     current_name = excluded.current_name,
                     gender = excluded.gender,
                     updated_at = excluded.updated_at",
            )
            .bind(&actor_id)
            .bind(&actor.current_name)
            .bind(gender.as_str())
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

            sqlx::query("INSERT OR IGNORE INTO act_in (movie_id, actor_id) VALUES (?, ?)")
                .bind(movie_id)
                .bind(&actor_id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;

            for name in &actor.names {
                sqlx::query(
                    "INSERT INTO actor_names (id, actor_id, jap_text, sch_text, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT(jap_text) DO UPDATE SET
                         actor_id = excluded.actor_id,
                         sch_text = COALESCE(excluded.sch_text, actor_names.sch_text),
                         updated_at = excluded.updated_at",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&actor_id)
                .bind(&name.original)
                .bind(&name.translated)
                .bind(&now)
                .bind(&now)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn write_terms(conn: &mut SqliteConnection, movie: &Movie) -> Result<(), AuroraError> {
        sqlx::query("DELETE FROM terms WHERE movie_id = ?")
            .bind(movie.id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

        let now = now_rfc3339();
        for term in &movie.terms {
            sqlx::query(
                "INSERT INTO terms (id, origin, recommended_translation, description, movie_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&term.origin)
            .bind(&term.recommended_translation)
            .bind(&term.description)
            .bind(movie.id.to_string())
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    /// Term → catalog promotion. The glossary keeps the first established
    /// translation (same rule as per-movie term dedup); the hit insert is
    /// a no-op when this movie already contributed the entry.
    async fn promote_terms_on(
        conn: &mut SqliteConnection,
        movie: &Movie,
    ) -> Result<(), AuroraError> {
        let now = now_rfc3339();
        for term in &movie.terms {
            let entry = Glossary::from_term(term);
            sqlx::query(
                "INSERT INTO glossaries (id, jap_text, sch_text, description, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(jap_text) DO UPDATE SET
                     sch_text = COALESCE(glossaries.sch_text, excluded.sch_text),
                     description = COALESCE(glossaries.description, excluded.description),
                     updated_at = excluded.updated_at",
            )
            .bind(entry.id.to_string())
            .bind(&entry.jap_text)
            .bind(&entry.sch_text)
            .bind(&entry.description)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;

            let row = sqlx::query("SELECT id FROM glossaries WHERE jap_text = ?")
                .bind(&entry.jap_text)
                .fetch_one(&mut *conn)
                .await
                .map_err(db_err)?;
            let glossary_id = parse_uuid(&row.get::<String, _>("id"))?;

            let hit = GlossaryHit::link(glossary_id, movie.id);
            sqlx::query(
                "INSERT OR IGNORE INTO glossary_hits_in (id, glossary_id, movie_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(hit.id.to_string())
            .bind(hit.glossary_id.to_string())
            .bind(hit.movie_id.to_string())
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn glossary_hits_on(
        conn: &mut SqliteConnection,
        movie: &Movie,
    ) -> Result<Vec<Glossary>, AuroraError> {
        let rows = sqlx::query(
            "SELECT g.id, g.jap_text, g.sch_text, g.description
             FROM glossary_hits_in h JOIN glossaries g ON h.glossary_id = g.id
             WHERE h.movie_id = ?",
        )
        .bind(movie.id.to_string())
        .fetch_all(conn)
        .await
        .map_err(db_err)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(Glossary {
                id: parse_uuid(&row.get::<String, _>("id"))?,
                jap_text: row.get("jap_text"),
                sch_text: row.get("sch_text"),
                description: row.get("description"),
            });
        }
        Ok(entries)
    }

    async fn insert_movie_row(
        conn: &mut SqliteConnection,
        movie: &Movie,
    ) -> Result<(), AuroraError> {
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO movies (id, label, number, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(label, number) DO NOTHING",
        )
        .bind(movie.id.to_string())
        .bind(movie.code.label())
        .bind(movie.code.number())
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn save_video_row(
        conn: &mut SqliteConnection,
        video: &Video,
    ) -> Result<(), AuroraError> {
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO videos (id, movie_id, sha256, filename, suffix, absolute_path, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(sha256) DO UPDATE SET
                 movie_id = COALESCE(excluded.movie_id, videos.movie_id),
                 filename = excluded.filename,
                 suffix = excluded.suffix,
                 absolute_path = excluded.absolute_path,
                 updated_at = excluded.updated_at",
        )
        .bind(video.id.to_string())
        .bind(video.movie_id.map(|id| id.to_string()))
        .bind(video.fingerprint.as_str())
        .bind(&video.filename)
        .bind(&video.suffix)
        .bind(video.absolute_path.to_string_lossy().to_string())
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    // ========== Per-operation implementations ==========

    async fn get_or_create_movie_on(
        conn: &mut SqliteConnection,
        code: AvCode,
    ) -> Result<Movie, AuroraError> {
        if let Some(row) = Self::movie_row_by_code(conn, &code).await? {
            let id = parse_uuid(&row.get::<String, _>("id"))?;
            let mut movie = Movie::with_code(code);
            movie.id = id;
            return Ok(movie);
        }
        let movie = Movie::with_code(code);
        Self::insert_movie_row(conn, &movie).await?;
        Ok(movie)
    }

    async fn get_movie_on(
        conn: &mut SqliteConnection,
        code: &AvCode,
    ) -> Result<Option<Movie>, AuroraError> {
        let Some(row) = Self::movie_row_by_code(conn, code).await? else {
            return Ok(None);
        };
        let id = parse_uuid(&row.get::<String, _>("id"))?;
        let mut movie = Movie::with_code(code.clone());
        movie.id = id;
        movie.metadata = Self::metadata_for_row(conn, &row).await?;

        let term_rows = sqlx::query(
            "SELECT origin, recommended_translation, description FROM terms WHERE movie_id = ?",
        )
        .bind(id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;
        movie.terms = term_rows
            .iter()
            .map(|r| Term {
                origin: r.get("origin"),
                recommended_translation: r.get("recommended_translation"),
                description: r.get("description"),
            })
            .collect();

        let video_rows = sqlx::query("SELECT * FROM videos WHERE movie_id = ?")
            .bind(id.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_err)?;
        for row in &video_rows {
            movie.videos.push(Self::video_from_row(conn, row).await?);
        }

        Ok(Some(movie))
    }

    async fn register_movie_on(
        conn: &mut SqliteConnection,
        movie: &Movie,
    ) -> Result<(), AuroraError> {
        Self::insert_movie_row(conn, movie).await?;
        for video in &movie.videos {
            Self::save_video_row(conn, video).await?;
        }
        Ok(())
    }

    async fn update_movie_on(
        conn: &mut SqliteConnection,
        movie: &Movie,
    ) -> Result<(), AuroraError> {
        let movie_id = movie.id.to_string();
        let Some(metadata) = &movie.metadata else {
            // Nothing scraped yet; terms may still need rewriting.
            if !movie.terms.is_empty() {
                Self::write_terms(conn, movie).await?;
            }
            return Ok(());
        };

        let director_id = match &metadata.director {
            Some(d) => Some(Self::upsert_bilingual(conn, "directors", d).await?),
            None => None,
        };
        let studio_id = match &metadata.studio {
            Some(s) => Some(Self::upsert_bilingual(conn, "studios", s).await?),
            None => None,
        };

        sqlx::query(
            "UPDATE movies SET
                 title_ja = ?, title_zh = ?, synopsis_ja = ?, synopsis_zh = ?,
                 release_date = ?, director_id = ?, studio_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(metadata.title.as_ref().map(|t| t.original.clone()))
        .bind(metadata.title.as_ref().and_then(|t| t.translated.clone()))
        .bind(metadata.synopsis.as_ref().map(|t| t.original.clone()))
        .bind(metadata.synopsis.as_ref().and_then(|t| t.translated.clone()))
        .bind(&metadata.release_date)
        .bind(&director_id)
        .bind(&studio_id)
        .bind(now_rfc3339())
        .bind(&movie_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;

        // Categories: rewrite the link set.
        if let Some(categories) = &metadata.categories {
            sqlx::query("DELETE FROM is_a_movie_of WHERE movie_id = ?")
                .bind(&movie_id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;

            let pairs: Vec<BilingualText> = match categories {
                CategorySet::ItemWise(items) => items.clone(),
                CategorySet::ListWise(list) => {
                    // Item-wise rows only when the lists line up; otherwise
                    // the tags stay untranslated here.
                    let translated_ok = list.fully_translated();
                    list.original
                        .iter()
                        .enumerate()
                        .map(|(i, original)| BilingualText {
                            original: original.clone(),
                            translated: if translated_ok {
                                list.translated.as_ref().map(|t| t[i].clone())
                            } else {
                                None
                            },
                        })
                        .collect()
                }
            };
            for category in &pairs {
                let category_id = Self::upsert_bilingual(conn, "categories", category).await?;
                sqlx::query(
                    "INSERT OR IGNORE INTO is_a_movie_of (movie_id, category_id) VALUES (?, ?)",
                )
                .bind(&movie_id)
                .bind(&category_id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            }
        }

        // Performers: one arena, act_in rewritten for both genders.
        if !metadata.actors.is_empty() || !metadata.actresses.is_empty() {
            sqlx::query("DELETE FROM act_in WHERE movie_id = ?")
                .bind(&movie_id)
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            Self::write_actors(conn, &movie_id, &metadata.actors, Gender::Male).await?;
            Self::write_actors(conn, &movie_id, &metadata.actresses, Gender::Female).await?;
        }

        if !movie.terms.is_empty() {
            Self::write_terms(conn, movie).await?;
        }
        Ok(())
    }

    async fn get_metadata_on(
        conn: &mut SqliteConnection,
        code: &AvCode,
    ) -> Result<Option<Metadata>, AuroraError> {
        match Self::movie_row_by_code(conn, code).await? {
            Some(row) => Self::metadata_for_row(conn, &row).await,
            None => Ok(None),
        }
    }

    async fn get_entity_on(
        conn: &mut SqliteConnection,
        kind: EntityKind,
        original: &str,
    ) -> Result<Option<String>, AuroraError> {
        let query = match kind {
            EntityKind::Title => "SELECT title_zh AS t FROM movies WHERE title_ja = ?",
            EntityKind::Synopsis => "SELECT synopsis_zh AS t FROM movies WHERE synopsis_ja = ?",
            EntityKind::Director => "SELECT sch_text AS t FROM directors WHERE jap_text = ?",
            EntityKind::Studio => "SELECT sch_text AS t FROM studios WHERE jap_text = ?",
            EntityKind::Category => "SELECT sch_text AS t FROM categories WHERE jap_text = ?",
            EntityKind::Actor => "SELECT sch_text AS t FROM actor_names WHERE jap_text = ?",
        };
        let row = sqlx::query(query)
            .bind(original)
            .fetch_optional(conn)
            .await
            .map_err(db_err)?;
        Ok(row.and_then(|r| r.get::<Option<String>, _>("t")))
    }

    async fn find_video_on(
        conn: &mut SqliteConnection,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Video>, AuroraError> {
        let row = sqlx::query("SELECT * FROM videos WHERE sha256 = ?")
            .bind(fingerprint.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(Self::video_from_row(conn, &row).await?)),
            None => Ok(None),
        }
    }

    async fn find_movie_of_video_on(
        conn: &mut SqliteConnection,
        video: &Video,
    ) -> Result<Option<Movie>, AuroraError> {
        let row = sqlx::query(
            "SELECT m.id, m.label, m.number
             FROM movies m JOIN videos v ON v.movie_id = m.id
             WHERE v.sha256 = ?",
        )
        .bind(video.fingerprint.as_str())
        .fetch_optional(conn)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let code = AvCode::from_parts(&row.get::<String, _>("label"), &row.get::<String, _>("number"))?;
        let mut movie = Movie::with_code(code);
        movie.id = parse_uuid(&row.get::<String, _>("id"))?;
        Ok(Some(movie))
    }

    async fn update_video_location_on(
        conn: &mut SqliteConnection,
        video: &Video,
        new_path: &Path,
    ) -> Result<(), AuroraError> {
        let filename = new_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                AuroraError::ValidationError(format!(
                    "Path has no filename: {}",
                    new_path.display()
                ))
            })?;
        sqlx::query(
            "UPDATE videos SET absolute_path = ?, filename = ?, updated_at = ? WHERE sha256 = ?",
        )
        .bind(new_path.to_string_lossy().to_string())
        .bind(filename)
        .bind(now_rfc3339())
        .bind(video.fingerprint.as_str())
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_video_on(
        conn: &mut SqliteConnection,
        video: &Video,
    ) -> Result<(), AuroraError> {
        let now = now_rfc3339();
        for stage in VideoStage::ORDER {
            let Some(row) = video.stages.get(&stage) else {
                continue;
            };
            sqlx::query(
                "INSERT INTO video_stage_statuses
                     (id, video_id, stage_name, status, by_product_path, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(video_id, stage_name) DO UPDATE SET
                     status = excluded.status,
                     by_product_path = excluded.by_product_path,
                     updated_at = excluded.updated_at",
            )
            .bind(row.id.to_string())
            .bind(video.id.to_string())
            .bind(stage.as_str())
            .bind(row.status.as_str())
            .bind(
                row.by_product_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string()),
            )
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }
        Ok(())
    }

    async fn load_video_state_on(
        conn: &mut SqliteConnection,
        video: &mut Video,
    ) -> Result<(), AuroraError> {
        // Resolve the persisted row id so stage rows attach to it even when
        // the in-memory value was freshly constructed.
        let row = sqlx::query("SELECT id, movie_id FROM videos WHERE sha256 = ?")
            .bind(video.fingerprint.as_str())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;

        if let Some(row) = row {
            video.id = parse_uuid(&row.get::<String, _>("id"))?;
            video.movie_id = row
                .get::<Option<String>, _>("movie_id")
                .map(|s| parse_uuid(&s))
                .transpose()?;
            Self::load_stage_rows(conn, video).await?;
        } else {
            for stage in VideoStage::ORDER {
                video
                    .stages
                    .entry(stage)
                    .or_insert_with(|| EntityStageStatus::pending(stage));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Manifest for SqliteManifest {
    async fn begin_transaction(&self) -> Result<(), AuroraError> {
        let mut guard = self.tx.lock().await;
        if guard.is_some() {
            return Err(AuroraError::DatabaseError(
                "Transaction already in progress".into(),
            ));
        }
        *guard = Some(self.pool.begin().await.map_err(db_err)?);
        debug!("Manifest transaction opened");
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<(), AuroraError> {
        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.take() {
            tx.commit().await.map_err(db_err)?;
            debug!("Manifest transaction committed");
        }
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<(), AuroraError> {
        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.take() {
            tx.rollback().await.map_err(db_err)?;
            debug!("Manifest transaction rolled back");
        }
        Ok(())
    }

    async fn get_or_create_standard_movie(
        &self,
        label: &str,
        number: &str,
    ) -> Result<Movie, AuroraError> {
        let code = AvCode::standard(label, number)?;
        on_conn!(self, get_or_create_movie_on(code))
    }

    async fn get_or_create_anonymous_movie(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Movie, AuroraError> {
        let code = AvCode::anonymous(fingerprint.as_str())?;
        on_conn!(self, get_or_create_movie_on(code))
    }

    async fn get_movie(&self, code: &AvCode) -> Result<Option<Movie>, AuroraError> {
        on_conn!(self, get_movie_on(code))
    }

    async fn register_movie(&self, movie: &Movie) -> Result<(), AuroraError> {
        on_conn!(self, register_movie_on(movie))
    }

    async fn update_movie(&self, movie: &Movie) -> Result<(), AuroraError> {
        on_conn!(self, update_movie_on(movie))
    }

    async fn update_terms(&self, movie: &Movie) -> Result<(), AuroraError> {
        on_conn!(self, write_terms(movie))
    }

    async fn promote_terms_to_glossary(&self, movie: &Movie) -> Result<(), AuroraError> {
        on_conn!(self, promote_terms_on(movie))
    }

    async fn get_glossary_hits(&self, movie: &Movie) -> Result<Vec<Glossary>, AuroraError> {
        on_conn!(self, glossary_hits_on(movie))
    }

    async fn get_metadata(&self, code: &AvCode) -> Result<Option<Metadata>, AuroraError> {
        on_conn!(self, get_metadata_on(code))
    }

    async fn get_entity(
        &self,
        kind: EntityKind,
        original: &str,
    ) -> Result<Option<String>, AuroraError> {
        if original.is_empty() {
            return Ok(None);
        }
        on_conn!(self, get_entity_on(kind, original))
    }

    async fn find_video(&self, fingerprint: &Fingerprint) -> Result<Option<Video>, AuroraError> {
        on_conn!(self, find_video_on(fingerprint))
    }

    async fn find_movie_of_video(&self, video: &Video) -> Result<Option<Movie>, AuroraError> {
        on_conn!(self, find_movie_of_video_on(video))
    }

    async fn save_video(&self, video: &Video) -> Result<(), AuroraError> {
        on_conn!(self, save_video_row(video))
    }

    async fn update_video_location(
        &self,
        video: &Video,
        new_path: &Path,
    ) -> Result<(), AuroraError> {
        on_conn!(self, update_video_location_on(video, new_path))
    }

    async fn update_video(&self, video: &Video) -> Result<(), AuroraError> {
        on_conn!(self, update_video_on(video))
    }

    async fn load_video_state(&self, video: &mut Video) -> Result<(), AuroraError> {
        on_conn!(self, load_video_state_on(video))
    }
}
