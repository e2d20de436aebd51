// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scrape Stage
//!
//! The one movie-level stage. When the manifest holds no metadata for the
//! movie, the scraper fleet is tried in order until one returns a graph.
//! Afterwards every scalar field whose translation is still missing goes
//! through the entity cache first and the orchestrator second.
//!
//! Order matters at the end: title and synopsis are translated **after**
//! performers, categories, director and studio, because their prompts
//! reference the performer rosters — translating them first would feed the
//! model untranslated names.
//!
//! Every translation here is best-effort: a failed lookup leaves the
//! field's `translated` as None and the pipeline carries on.

use async_trait::async_trait;
use tracing::{info, warn};

use aurora_domain::entities::{BilingualText, CategorySet, Movie};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::{EntityKind, Manifest as _};
use aurora_domain::services::{TaskType, WebScraper};
use aurora_domain::value_objects::MOVIE_STAGE_SCRAPE;

use super::{MovieStage, StageContext};

use std::sync::Arc;

/// Movie-level metadata scraping and translation.
pub struct ScrapeStage {
    scrapers: Vec<Arc<dyn WebScraper>>,
}

impl ScrapeStage {
    pub fn new(scrapers: Vec<Arc<dyn WebScraper>>) -> Self {
        Self { scrapers }
    }

    /// Cache-first translation of one original text.
    async fn translate_with_cache(
        ctx: &StageContext,
        kind: EntityKind,
        task: TaskType,
        original: &str,
    ) -> Option<String> {
        match ctx.manifest.get_entity(kind, original).await {
            Ok(Some(cached)) => {
                info!("Cache hit for {} '{}'", kind.as_str(), original);
                return Some(cached);
            }
            Ok(None) => {}
            Err(err) => warn!("Entity cache lookup failed for '{}': {}", original, err),
        }

        info!("Translating {} '{}'", kind.as_str(), original);
        let result = ctx.translator.translate_generic_metadata(task, original).await;
        if result.success {
            result.content
        } else {
            warn!("Translation failed for {} '{}'", kind.as_str(), original);
            None
        }
    }

    async fn fill_text(
        ctx: &StageContext,
        kind: EntityKind,
        task: TaskType,
        text: &mut BilingualText,
    ) {
        if text.translated.is_none() {
            text.translated = Self::translate_with_cache(ctx, kind, task, &text.original).await;
        }
    }
}

#[async_trait]
impl MovieStage for ScrapeStage {
    fn name(&self) -> &'static str {
        MOVIE_STAGE_SCRAPE
    }

    fn should_execute(&self, movie: &Movie) -> bool {
        movie.metadata.is_none()
    }

    async fn execute(&self, movie: &mut Movie, ctx: &StageContext) -> Result<(), AuroraError> {
        // The manifest may already hold an earlier run's scrape.
        if movie.metadata.is_none() {
            movie.metadata = ctx.manifest.get_metadata(&movie.code).await?;
        }

        if movie.metadata.is_none() {
            info!("Scraping metadata for {}", movie.code);
            for scraper in &self.scrapers {
                if !scraper.available() {
                    continue;
                }
                match scraper.fetch_metadata(&movie.code).await {
                    Ok(metadata) => {
                        movie.metadata = Some(metadata);
                        break;
                    }
                    Err(err) => {
                        warn!(
                            "Scraper {} failed for {}: {}",
                            scraper.base_url(),
                            movie.code,
                            err
                        );
                    }
                }
            }
            if movie.metadata.is_none() {
                // Non-fatal: the movie just stays metadata-less.
                warn!("All scrapers failed for {}", movie.code);
                return Ok(());
            }
        }

        let mut metadata = movie.metadata.take().expect("metadata set above");

        // Generic fields first; they feed the title/synopsis prompts.
        if let Some(director) = &mut metadata.director {
            Self::fill_text(ctx, EntityKind::Director, TaskType::MetadataDirector, director)
                .await;
        }
        if let Some(studio) = &mut metadata.studio {
            Self::fill_text(ctx, EntityKind::Studio, TaskType::MetadataStudio, studio).await;
        }

        match &mut metadata.categories {
            Some(CategorySet::ItemWise(items)) => {
                for item in items {
                    Self::fill_text(ctx, EntityKind::Category, TaskType::MetadataCategory, item)
                        .await;
                }
            }
            Some(CategorySet::ListWise(list)) => {
                // A scraped translated list may be shorter than the
                // original; only a fully-paired list is kept as-is.
                if !list.fully_translated() {
                    let mut translated = Vec::with_capacity(list.original.len());
                    for original in &list.original {
                        let item = Self::translate_with_cache(
                            ctx,
                            EntityKind::Category,
                            TaskType::MetadataCategory,
                            original,
                        )
                        .await;
                        translated.push(item.unwrap_or_else(|| original.clone()));
                    }
                    list.translated = Some(translated);
                }
            }
            None => {}
        }

        for actor in metadata.actors.iter_mut().chain(metadata.actresses.iter_mut()) {
            for name in &mut actor.names {
                Self::fill_text(ctx, EntityKind::Actor, TaskType::MetadataActor, name).await;
            }
        }

        // Title and synopsis last: their prompts reference the rosters.
        let actors = metadata.actor_roster();
        let actresses = metadata.actress_roster();

        if let Some(title) = &mut metadata.title {
            if title.translated.is_none() {
                title.translated = match ctx
                    .manifest
                    .get_entity(EntityKind::Title, &title.original)
                    .await?
                {
                    Some(cached) => Some(cached),
                    None => {
                        let result = ctx
                            .translator
                            .translate_title(&title.original, actors.clone(), actresses.clone())
                            .await;
                        if result.success {
                            result.content
                        } else {
                            warn!("Title translation failed for {}", movie.code);
                            None
                        }
                    }
                };
            }
        }

        if let Some(synopsis) = &mut metadata.synopsis {
            if synopsis.translated.is_none() {
                synopsis.translated = match ctx
                    .manifest
                    .get_entity(EntityKind::Synopsis, &synopsis.original)
                    .await?
                {
                    Some(cached) => Some(cached),
                    None => {
                        let result = ctx
                            .translator
                            .translate_synopsis(&synopsis.original, actors, actresses)
                            .await;
                        if result.success {
                            result.content
                        } else {
                            warn!("Synopsis translation failed for {}", movie.code);
                            None
                        }
                    }
                };
            }
        }

        movie.metadata = Some(metadata);
        info!("Completed metadata scraping and translation for {}", movie.code);
        Ok(())
    }
}
