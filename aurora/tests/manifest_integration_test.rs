// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Integration tests for the SQLite manifest: identity idempotence, move
//! detection, the bilingual metadata round trip, actor consolidation, and
//! the entity cache.

use std::path::{Path, PathBuf};

use aurora::infrastructure::repositories::{schema, SqliteManifest};
use aurora_domain::entities::{
    Actor, BilingualText, CategorySet, Metadata, Movie, StageStatus, Term, Video,
};
use aurora_domain::repositories::{EntityKind, Manifest};
use aurora_domain::value_objects::{Fingerprint, VideoStage};
use tempfile::TempDir;

struct TestDb {
    manifest: SqliteManifest,
    _dir: TempDir,
}

async fn test_db() -> TestDb {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("manifest.db").display());
    let pool = schema::open_manifest_database(&url).await.unwrap();
    TestDb {
        manifest: SqliteManifest::new(pool),
        _dir: dir,
    }
}

fn fingerprint(seed: u8) -> Fingerprint {
    Fingerprint::new(&format!("{:02x}", seed).repeat(32)).unwrap()
}

fn video_at(path: &str, seed: u8) -> Video {
    Video::new(Path::new(path), fingerprint(seed)).unwrap()
}

fn full_metadata() -> Metadata {
    let mut metadata = Metadata::default();
    metadata.title = Some(BilingualText::new("先輩の物語").with_translation("前辈的故事"));
    metadata.synopsis = Some(BilingualText::new("あらすじ"));
    metadata.release_date = Some("2024-03-01".into());
    metadata.director = Some(BilingualText::new("きとるね川口").with_translation("基托鲁内川口"));
    metadata.studio = Some(BilingualText::new("S1"));
    metadata.categories = Some(CategorySet::ItemWise(vec![
        BilingualText::new("単体作品").with_translation("单体作品"),
        BilingualText::new("ドラマ"),
    ]));
    metadata.actresses = vec![Actor {
        current_name: "星宮一花".into(),
        names: vec![BilingualText::new("星宮一花").with_translation("星宫一花")],
    }];
    metadata.actors = vec![Actor {
        current_name: "男優A".into(),
        names: vec![BilingualText::new("男優A")],
    }];
    metadata
}

#[tokio::test]
async fn test_get_or_create_standard_movie_is_idempotent() {
    let db = test_db().await;

    let first = db
        .manifest
        .get_or_create_standard_movie("ABC", "123")
        .await
        .unwrap();
    let second = db
        .manifest
        .get_or_create_standard_movie("abc", "123")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.code_string(), "ABC-123");
}

#[tokio::test]
async fn test_anonymous_movie_pins_to_first_fingerprint() {
    let db = test_db().await;
    let fp = fingerprint(0xaa);

    let first = db.manifest.get_or_create_anonymous_movie(&fp).await.unwrap();
    let second = db.manifest.get_or_create_anonymous_movie(&fp).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.is_anonymous());
    assert_eq!(second.code.number(), fp.as_str());
}

#[tokio::test]
async fn test_register_movie_twice_no_duplicates() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("ABC", "123")
        .await
        .unwrap();
    let mut video = video_at("/a/ABC-123.mp4", 1);
    video.movie_id = Some(movie.id);
    movie.videos.push(video);

    db.manifest.register_movie(&movie).await.unwrap();
    db.manifest.register_movie(&movie).await.unwrap();

    let loaded = db.manifest.get_movie(&movie.code).await.unwrap().unwrap();
    assert_eq!(loaded.videos.len(), 1);
    assert_eq!(loaded.id, movie.id);
}

#[tokio::test]
async fn test_move_detection_keeps_identity_and_stage_rows() {
    let db = test_db().await;

    let movie = db
        .manifest
        .get_or_create_standard_movie("ABC", "123")
        .await
        .unwrap();
    let mut video = video_at("/a/ABC-123.mp4", 2);
    video.movie_id = Some(movie.id);
    db.manifest.save_video(&video).await.unwrap();

    video.set_stage(
        VideoStage::ExtractAudio,
        StageStatus::Success,
        Some(PathBuf::from("/out/ABC-123/x.extract.wav")),
    );
    db.manifest.update_video(&video).await.unwrap();

    // The file moves; only location facts may change.
    let new_path = Path::new("/b/renamed.mp4");
    db.manifest
        .update_video_location(&video, new_path)
        .await
        .unwrap();

    let reloaded = db
        .manifest
        .find_video(&video.fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.id, video.id);
    assert_eq!(reloaded.absolute_path, new_path);
    assert_eq!(reloaded.filename, "renamed");
    assert_eq!(
        reloaded.stage_status(VideoStage::ExtractAudio),
        StageStatus::Success
    );
    assert!(reloaded.by_product(VideoStage::ExtractAudio).is_some());
}

#[tokio::test]
async fn test_update_movie_metadata_round_trip() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("SSIS", "001")
        .await
        .unwrap();
    movie.metadata = Some(full_metadata());
    db.manifest.update_movie(&movie).await.unwrap();

    let loaded = db.manifest.get_metadata(&movie.code).await.unwrap().unwrap();

    assert_eq!(loaded.title.as_ref().unwrap().original, "先輩の物語");
    assert_eq!(
        loaded.title.as_ref().unwrap().translated.as_deref(),
        Some("前辈的故事")
    );
    assert_eq!(loaded.release_date.as_deref(), Some("2024-03-01"));
    assert_eq!(
        loaded.director.as_ref().unwrap().translated.as_deref(),
        Some("基托鲁内川口")
    );
    assert_eq!(loaded.studio.as_ref().unwrap().original, "S1");
    assert_eq!(loaded.synopsis.as_ref().unwrap().original, "あらすじ");

    // Categories come back item-wise; order is not promised.
    let Some(CategorySet::ItemWise(items)) = &loaded.categories else {
        panic!("expected item-wise categories");
    };
    let mut originals: Vec<&str> = items.iter().map(|t| t.original.as_str()).collect();
    originals.sort();
    assert_eq!(originals, vec!["ドラマ", "単体作品"]);

    assert_eq!(loaded.actresses.len(), 1);
    assert_eq!(loaded.actresses[0].current_name, "星宮一花");
    assert_eq!(loaded.actors.len(), 1);
}

#[tokio::test]
async fn test_update_movie_is_idempotent() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("SSIS", "001")
        .await
        .unwrap();
    movie.metadata = Some(full_metadata());
    db.manifest.update_movie(&movie).await.unwrap();
    db.manifest.update_movie(&movie).await.unwrap();

    let loaded = db.manifest.get_metadata(&movie.code).await.unwrap().unwrap();
    let Some(CategorySet::ItemWise(items)) = &loaded.categories else {
        panic!("expected item-wise categories");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(loaded.actresses.len(), 1);
}

#[tokio::test]
async fn test_actor_alias_consolidation() {
    let db = test_db().await;

    // First movie registers the performer under one name.
    let mut first = db
        .manifest
        .get_or_create_standard_movie("AAA", "100")
        .await
        .unwrap();
    let mut metadata = Metadata::default();
    metadata.title = Some(BilingualText::new("一"));
    metadata.actresses = vec![Actor {
        current_name: "旧芸名".into(),
        names: vec![BilingualText::new("旧芸名").with_translation("旧艺名")],
    }];
    first.metadata = Some(metadata);
    db.manifest.update_movie(&first).await.unwrap();

    // Second movie sees her renamed, with the old name as an alias.
    let mut second = db
        .manifest
        .get_or_create_standard_movie("BBB", "200")
        .await
        .unwrap();
    let mut metadata = Metadata::default();
    metadata.title = Some(BilingualText::new("二"));
    metadata.actresses = vec![Actor {
        current_name: "新芸名".into(),
        names: vec![BilingualText::new("新芸名"), BilingualText::new("旧芸名")],
    }];
    second.metadata = Some(metadata);
    db.manifest.update_movie(&second).await.unwrap();

    // Consolidation: both aliases hang off one actor identity, so the
    // second movie's roster carries both names.
    let loaded = db.manifest.get_metadata(&second.code).await.unwrap().unwrap();
    assert_eq!(loaded.actresses.len(), 1);
    let mut names: Vec<&str> = loaded.actresses[0]
        .names
        .iter()
        .map(|n| n.original.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["新芸名", "旧芸名"]);
    // The alias keeps the translation learned from the first movie.
    assert!(loaded.actresses[0]
        .names
        .iter()
        .any(|n| n.translated.as_deref() == Some("旧艺名")));
}

#[tokio::test]
async fn test_get_entity_cache_lookups() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("SSIS", "001")
        .await
        .unwrap();
    movie.metadata = Some(full_metadata());
    db.manifest.update_movie(&movie).await.unwrap();

    assert_eq!(
        db.manifest
            .get_entity(EntityKind::Director, "きとるね川口")
            .await
            .unwrap()
            .as_deref(),
        Some("基托鲁内川口")
    );
    assert_eq!(
        db.manifest
            .get_entity(EntityKind::Category, "単体作品")
            .await
            .unwrap()
            .as_deref(),
        Some("单体作品")
    );
    assert_eq!(
        db.manifest
            .get_entity(EntityKind::Actor, "星宮一花")
            .await
            .unwrap()
            .as_deref(),
        Some("星宫一花")
    );
    assert_eq!(
        db.manifest
            .get_entity(EntityKind::Title, "先輩の物語")
            .await
            .unwrap()
            .as_deref(),
        Some("前辈的故事")
    );
    // Untranslated entities miss rather than return empty strings.
    assert!(db
        .manifest
        .get_entity(EntityKind::Category, "ドラマ")
        .await
        .unwrap()
        .is_none());
    assert!(db
        .manifest
        .get_entity(EntityKind::Studio, "知らない")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_terms_rewrite_per_movie() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("ABC", "123")
        .await
        .unwrap();
    movie.terms = vec![Term::new("ウエムラ", "上村")];
    db.manifest.update_terms(&movie).await.unwrap();

    movie.terms.push(Term::new("ナフレス", "那弗勒斯").with_description("虚构城市"));
    db.manifest.update_terms(&movie).await.unwrap();

    let loaded = db.manifest.get_movie(&movie.code).await.unwrap().unwrap();
    assert_eq!(loaded.terms.len(), 2);
    let origins: Vec<&str> = loaded.terms.iter().map(|t| t.origin.as_str()).collect();
    assert!(origins.contains(&"ウエムラ"));
    assert!(origins.contains(&"ナフレス"));
}

#[tokio::test]
async fn test_glossary_promotion_across_movies() {
    let db = test_db().await;

    // First movie contributes one term with its translation.
    let mut first = db
        .manifest
        .get_or_create_standard_movie("AAA", "100")
        .await
        .unwrap();
    first.terms = vec![Term::new("ウエムラ", "上村").with_description("反派角色名")];
    db.manifest.update_terms(&first).await.unwrap();
    db.manifest.promote_terms_to_glossary(&first).await.unwrap();

    // Second movie sees the same noun (different translation attempt) plus
    // a fresh one.
    let mut second = db
        .manifest
        .get_or_create_standard_movie("BBB", "200")
        .await
        .unwrap();
    second.terms = vec![Term::new("ウエムラ", "植村"), Term::new("ナフレス", "那弗勒斯")];
    db.manifest.update_terms(&second).await.unwrap();
    db.manifest.promote_terms_to_glossary(&second).await.unwrap();

    let first_hits = db.manifest.get_glossary_hits(&first).await.unwrap();
    assert_eq!(first_hits.len(), 1);
    assert_eq!(first_hits[0].jap_text, "ウエムラ");

    let second_hits = db.manifest.get_glossary_hits(&second).await.unwrap();
    assert_eq!(second_hits.len(), 2);

    // One catalog entry serves both movies, keeping the translation the
    // first movie established.
    let uemura = second_hits
        .iter()
        .find(|g| g.jap_text == "ウエムラ")
        .unwrap();
    assert_eq!(uemura.id, first_hits[0].id);
    assert_eq!(uemura.sch_text.as_deref(), Some("上村"));
    assert_eq!(uemura.description.as_deref(), Some("反派角色名"));
}

#[tokio::test]
async fn test_glossary_promotion_is_idempotent() {
    let db = test_db().await;

    let mut movie = db
        .manifest
        .get_or_create_standard_movie("CCC", "300")
        .await
        .unwrap();
    movie.terms = vec![Term::new("アマカノ", "甘加乃")];
    db.manifest.promote_terms_to_glossary(&movie).await.unwrap();
    db.manifest.promote_terms_to_glossary(&movie).await.unwrap();

    let hits = db.manifest.get_glossary_hits(&movie).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_load_video_state_materializes_pending_rows() {
    let db = test_db().await;

    let movie = db
        .manifest
        .get_or_create_standard_movie("ABC", "123")
        .await
        .unwrap();
    let mut video = video_at("/a/ABC-123.mp4", 3);
    video.movie_id = Some(movie.id);
    db.manifest.save_video(&video).await.unwrap();

    let mut fresh = video_at("/a/ABC-123.mp4", 3);
    db.manifest.load_video_state(&mut fresh).await.unwrap();

    assert_eq!(fresh.id, video.id);
    assert_eq!(fresh.stages.len(), VideoStage::ORDER.len());
    for stage in VideoStage::ORDER {
        assert_eq!(fresh.stage_status(stage), StageStatus::Pending);
    }
}

#[tokio::test]
async fn test_rollback_discards_movie_session() {
    let db = test_db().await;

    db.manifest.begin_transaction().await.unwrap();
    let movie = db
        .manifest
        .get_or_create_standard_movie("ROL", "999")
        .await
        .unwrap();
    db.manifest.rollback_transaction().await.unwrap();

    assert!(db.manifest.get_movie(&movie.code).await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_persists_movie_session() {
    let db = test_db().await;

    db.manifest.begin_transaction().await.unwrap();
    let movie = db
        .manifest
        .get_or_create_standard_movie("COM", "111")
        .await
        .unwrap();
    db.manifest.commit_transaction().await.unwrap();

    assert!(db.manifest.get_movie(&movie.code).await.unwrap().is_some());
}
