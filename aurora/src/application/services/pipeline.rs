// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Engine
//!
//! Drives the stage sequence per movie and per video against the manifest.
//! `run(root)` scans, then processes each movie inside one transaction:
//! register/refresh state, run movie stages, reconcile and run each
//! video's stages in declared order, commit. Any error mid-movie rolls the
//! transaction back and the engine moves on to the next movie — a failed
//! movie stays resumable, never half-committed.
//!
//! ## Reconciliation (`sync_video_status`)
//!
//! The kernel that makes reruns cheap and user deletions meaningful:
//!
//! 1. **Terminal optimization** — when the terminal stage is SUCCESS and
//!    its artifact exists on disk, nothing is touched. Users may delete
//!    intermediates once the final asset exists.
//! 2. Otherwise the stage order is scanned for the **break index**: the
//!    first stage that is not SUCCESS, or whose recorded by-product has
//!    gone missing (deleting an artifact is the supported way to force a
//!    re-run from that stage).
//! 3. From the break index to the end every row resets to PENDING and its
//!    recorded by-product is unlinked best-effort.
//!
//! ## Execution loop
//!
//! Per stage: SUCCESS and SKIPPED skip, FAILED aborts the remainder of the
//! video, PENDING executes. A stage error is logged, the stage marked
//! FAILED, and the video's remaining stages abandoned; the movie's other
//! videos still run.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use aurora_bootstrap::ShutdownToken;
use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::Manifest as _;
use aurora_domain::value_objects::VideoStage;

use crate::application::services::scanner::LibraryScanner;
use crate::application::stages::{MovieStage, StageContext, VideoStageRunner};

/// The staged processing engine.
pub struct Pipeline {
    movie_stages: Vec<Arc<dyn MovieStage>>,
    video_stages: Vec<Arc<dyn VideoStageRunner>>,
    scanner: LibraryScanner,
    context: StageContext,
    shutdown: ShutdownToken,
}

impl Pipeline {
    /// Wires the engine. `video_stages` must cover [`VideoStage::ORDER`]
    /// in declared order.
    pub fn new(
        movie_stages: Vec<Arc<dyn MovieStage>>,
        video_stages: Vec<Arc<dyn VideoStageRunner>>,
        scanner: LibraryScanner,
        context: StageContext,
        shutdown: ShutdownToken,
    ) -> Result<Self, AuroraError> {
        let declared: Vec<VideoStage> = video_stages.iter().map(|s| s.stage()).collect();
        if declared != VideoStage::ORDER {
            return Err(AuroraError::InvalidConfiguration(format!(
                "Video stages out of order: {:?}",
                declared
            )));
        }
        Ok(Self {
            movie_stages,
            video_stages,
            scanner,
            context,
            shutdown,
        })
    }

    /// Scans the root and processes every touched movie.
    pub async fn run(&self, root: &Path) -> Result<(), AuroraError> {
        let movies = self.scanner.scan(root).await?;
        info!("Scanned {} movies to process", movies.len());

        for movie in movies {
            if self.shutdown.is_cancelled() {
                warn!("Shutdown requested; stopping before the next movie");
                return Err(AuroraError::Cancelled("pipeline run interrupted".into()));
            }
            let code = movie.code_string();
            if let Err(err) = self.process_movie(movie).await {
                if matches!(err, AuroraError::Cancelled(_)) {
                    return Err(err);
                }
                // The movie rolled back; the next one gets its own chance.
                error!("Processing movie {} failed: {}", code, err);
            }
        }
        Ok(())
    }

    /// One movie, one transaction.
    pub async fn process_movie(&self, mut movie: Movie) -> Result<(), AuroraError> {
        info!("Start processing movie {}", movie.code);
        self.context.manifest.begin_transaction().await?;

        match self.process_movie_inner(&mut movie).await {
            Ok(()) => {
                self.context.manifest.commit_transaction().await?;
                info!("Finished movie {}", movie.code);
                Ok(())
            }
            Err(err) => {
                self.context.manifest.rollback_transaction().await?;
                Err(err)
            }
        }
    }

    async fn process_movie_inner(&self, movie: &mut Movie) -> Result<(), AuroraError> {
        self.context.manifest.register_movie(movie).await?;

        // Refresh in-memory state from the store: an earlier run may have
        // scraped metadata and accumulated terms.
        if let Some(persisted) = self.context.manifest.get_movie(&movie.code).await? {
            movie.id = persisted.id;
            movie.metadata = persisted.metadata;
            movie.terms = persisted.terms;
        }

        for stage in &self.movie_stages {
            if !stage.should_execute(movie) {
                continue;
            }
            info!("Movie {} running stage '{}'", movie.code, stage.name());
            if let Err(err) = stage.execute(movie, &self.context).await {
                // Movie stages are non-critical: a metadata-less movie
                // still gets its subtitles.
                warn!(
                    "Movie stage '{}' failed for {}: {}",
                    stage.name(),
                    movie.code,
                    err
                );
            }
            self.context.manifest.update_movie(movie).await?;
        }

        // Videos are processed against the movie they belong to; take the
        // list out so stages can mutate the movie (terms) alongside.
        let mut videos = std::mem::take(&mut movie.videos);
        let mut cancelled = false;
        for video in &mut videos {
            if self.shutdown.is_cancelled() {
                cancelled = true;
                break;
            }
            self.sync_video_status(video).await?;
            self.run_video_stages(movie, video).await?;
        }
        movie.videos = videos;

        if cancelled {
            return Err(AuroraError::Cancelled(format!(
                "movie {} interrupted",
                movie.code
            )));
        }
        Ok(())
    }

    /// The reconciliation kernel; see the module docs.
    async fn sync_video_status(&self, video: &mut Video) -> Result<(), AuroraError> {
        self.context.manifest.load_video_state(video).await?;

        // 1. Terminal optimization.
        let terminal = VideoStage::terminal();
        if video.stage_status(terminal) == StageStatus::Success {
            if let Some(path) = video.by_product(terminal) {
                if path.exists() {
                    info!(
                        "Video {} already has its final asset; skipping sync",
                        video.filename
                    );
                    return Ok(());
                }
            }
        }

        // 2. Find the break index.
        let mut break_index = None;
        for (i, stage) in VideoStage::ORDER.iter().enumerate() {
            let status = video.stage_status(*stage);
            if status != StageStatus::Success {
                break_index = Some(i);
                break;
            }
            match video.by_product(*stage) {
                Some(path) if path.exists() => {}
                _ => {
                    // SUCCESS with a missing artifact: the user deleted it
                    // to force a re-run from here.
                    info!(
                        "Video {} artifact for stage {} is gone; resetting from it",
                        video.filename, stage
                    );
                    break_index = Some(i);
                    break;
                }
            }
        }

        // 3. Reset the tail and unlink leftovers.
        if let Some(start) = break_index {
            for stage in &VideoStage::ORDER[start..] {
                if let Some(path) = video.by_product(*stage) {
                    match std::fs::remove_file(path) {
                        Ok(()) => info!("Unlinked stale by-product {}", path.display()),
                        Err(_) => {} // already gone is fine
                    }
                }
                video.reset_stage(*stage);
            }
            self.context.manifest.update_video(video).await?;
        }
        Ok(())
    }

    async fn run_video_stages(
        &self,
        movie: &mut Movie,
        video: &mut Video,
    ) -> Result<(), AuroraError> {
        for runner in &self.video_stages {
            if self.shutdown.is_cancelled() {
                return Err(AuroraError::Cancelled(format!(
                    "video {} interrupted",
                    video.filename
                )));
            }

            let stage = runner.stage();
            match video.stage_status(stage) {
                StageStatus::Success => {
                    info!("Stage {} already succeeded; skipping", stage);
                    continue;
                }
                StageStatus::Skipped => {
                    info!("Stage {} skipped earlier (non-critical); continuing", stage);
                    continue;
                }
                StageStatus::Failed => {
                    info!(
                        "Stage {} failed earlier; aborting remaining stages of {}",
                        stage, video.filename
                    );
                    break;
                }
                StageStatus::Pending => {}
            }

            info!(
                "Running stage {} for {} ({})",
                stage,
                video.filename,
                movie.code
            );
            if let Err(err) = runner.execute(movie, video, &self.context).await {
                error!(
                    "Stage {} failed for {} ({}): {}",
                    stage, video.filename, movie.code, err
                );
                // Backstop: stages set their own status, but an early `?`
                // must still leave a FAILED row behind.
                if video.stage_status(stage) != StageStatus::Failed {
                    video.set_stage(stage, StageStatus::Failed, None);
                }
            }

            // Correction feeds the movie's terms; persist them and promote
            // them into the cross-movie glossary catalog with the stage
            // outcome.
            if stage == VideoStage::CorrectSubtitle
                && video.stage_status(stage) == StageStatus::Success
            {
                self.context.manifest.update_terms(movie).await?;
                self.context.manifest.promote_terms_to_glossary(movie).await?;
            }
            self.context.manifest.update_video(video).await?;

            if video.stage_status(stage) == StageStatus::Failed {
                break;
            }
        }
        Ok(())
    }
}
