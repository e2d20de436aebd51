// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manifest Database Bootstrap
//!
//! Opens the SQLite file behind the manifest — creating it on first run —
//! and brings its schema up to date from the workspace `migrations/`
//! directory before anything touches a table. Foreign-key enforcement is
//! switched on per connection: the manifest schema leans on the ownership
//! chain (movies → videos → stage rows, glossaries → hits) and silently
//! orphaned rows would defeat the reconciliation kernel.
//!
//! Everything funnels through [`open_manifest_database`]; integration
//! tests use the same entry point against a tempdir file, so test and
//! production databases can never drift apart structurally.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use aurora_domain::error::AuroraError;

/// Opens (and on first run creates) the manifest database, then applies
/// pending migrations.
///
/// # Errors
///
/// `InvalidConfiguration` for an unparseable URL, `DatabaseError` when the
/// connection or a migration fails.
pub async fn open_manifest_database(database_url: &str) -> Result<SqlitePool, AuroraError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|err| {
            AuroraError::InvalidConfiguration(format!(
                "Bad database URL '{}': {}",
                database_url, err
            ))
        })?
        .create_if_missing(true)
        .foreign_keys(true);

    debug!("Opening manifest database at {}", database_url);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(|err| {
            AuroraError::DatabaseError(format!("Cannot open manifest database: {}", err))
        })?;

    run_migrations(&pool).await?;
    info!("Manifest database ready at {}", database_url);
    Ok(pool)
}

/// Applies pending migrations from the workspace `migrations/` directory;
/// sqlx tracks what has already run, so reruns are no-ops.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AuroraError> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|err| AuroraError::DatabaseError(format!("Migration failed: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Every owning table of the manifest schema, as the migrations must
    /// leave them.
    const MANIFEST_TABLES: [&str; 12] = [
        "movies",
        "videos",
        "video_stage_statuses",
        "directors",
        "studios",
        "categories",
        "actors",
        "actor_names",
        "act_in",
        "is_a_movie_of",
        "terms",
        "glossaries",
    ];

    fn url_in(dir: &TempDir) -> String {
        format!("sqlite://{}", dir.path().join("manifest.db").display())
    }

    #[tokio::test]
    async fn test_creates_file_and_is_idempotent() {
        let dir = TempDir::new().unwrap();

        let pool = open_manifest_database(&url_in(&dir)).await.unwrap();
        assert!(dir.path().join("manifest.db").exists());
        drop(pool);

        // A second open against the same file re-runs nothing and succeeds.
        open_manifest_database(&url_in(&dir)).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_build_the_full_manifest_schema() {
        let dir = TempDir::new().unwrap();
        let pool = open_manifest_database(&url_in(&dir)).await.unwrap();

        for table in MANIFEST_TABLES {
            let count: i32 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "table '{}' missing after migration", table);
        }

    }

    #[tokio::test]
    async fn test_glossary_hits_are_unique_per_movie() {
        let dir = TempDir::new().unwrap();
        let pool = open_manifest_database(&url_in(&dir)).await.unwrap();

        sqlx::query(
            "INSERT INTO movies (id, label, number, created_at, updated_at)
             VALUES ('m1', 'ABC', '123', '', '')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO glossaries (id, jap_text, created_at, updated_at)
             VALUES ('g1', 'ウエムラ', '', '')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO glossary_hits_in (id, glossary_id, movie_id, created_at, updated_at)
             VALUES ('h1', 'g1', 'm1', '', '')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // A second hit for the same (glossary, movie) pair is rejected.
        let duplicate = sqlx::query(
            "INSERT INTO glossary_hits_in (id, glossary_id, movie_id, created_at, updated_at)
             VALUES ('h2', 'g1', 'm1', '', '')",
        )
        .execute(&pool)
        .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let dir = TempDir::new().unwrap();
        let pool = open_manifest_database(&url_in(&dir)).await.unwrap();

        // A stage row for a video that does not exist must be rejected.
        let result = sqlx::query(
            "INSERT INTO video_stage_statuses
                 (id, video_id, stage_name, status, created_at, updated_at)
             VALUES ('x', 'missing-video', 'extract_audio', 'pending', '', '')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
