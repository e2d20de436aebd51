// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Stages
//!
//! One trait per entity kind: [`MovieStage`] (currently just scrape) and
//! [`VideoStageRunner`] for the fixed per-video sequence. A stage owns its
//! own bookkeeping — it writes its by-product, sets its own status row on
//! the entity — while the engine owns ordering, persistence, and the
//! failure policy (an `Err` from `execute` is logged and the stage marked
//! FAILED as a backstop).
//!
//! Stages receive shared services through [`StageContext`] and may not
//! open side channels to the store; everything flows through the
//! manifest handle the current transaction owns.

pub mod bilingual;
pub mod correct;
pub mod denoise;
pub mod extract;
pub mod scrape;
pub mod transcribe;
pub mod translate;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use aurora_domain::entities::{Movie, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::Manifest;
use aurora_domain::value_objects::VideoStage;

use crate::infrastructure::translation::TranslateOrchestrator;

pub use bilingual::BilingualSubtitleStage;
pub use correct::CorrectSubtitleStage;
pub use denoise::DenoiseAudioStage;
pub use extract::ExtractAudioStage;
pub use scrape::ScrapeStage;
pub use transcribe::TranscribeAudioStage;
pub use translate::TranslateSubtitleStage;

/// Shared services handed to every stage invocation.
pub struct StageContext {
    pub manifest: Arc<dyn Manifest>,
    pub translator: Arc<TranslateOrchestrator>,
    /// By-products land under `<output_dir>/<movie code>/`.
    pub output_dir: PathBuf,
}

impl StageContext {
    /// The by-product directory for one movie.
    pub fn movie_dir(&self, movie: &Movie) -> PathBuf {
        self.output_dir.join(movie.code_string())
    }
}

/// A movie-level transformation.
#[async_trait]
pub trait MovieStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the stage still has work for this movie.
    fn should_execute(&self, movie: &Movie) -> bool;

    async fn execute(&self, movie: &mut Movie, ctx: &StageContext) -> Result<(), AuroraError>;
}

/// One step of the fixed per-video sequence.
#[async_trait]
pub trait VideoStageRunner: Send + Sync {
    /// Which slot of [`VideoStage::ORDER`] this runner implements.
    fn stage(&self) -> VideoStage;

    /// Runs the transformation, setting the video's own stage row.
    ///
    /// The movie is mutable because correction feeds terms back into it.
    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError>;
}

/// Reads a by-product of an earlier stage, failing with context when the
/// chain is broken.
pub(crate) fn required_by_product(
    video: &Video,
    stage: VideoStage,
) -> Result<PathBuf, AuroraError> {
    video
        .by_product(stage)
        .map(|p| p.to_path_buf())
        .ok_or_else(|| {
            AuroraError::ProcessingFailed(format!(
                "Stage {} has no recorded by-product for {}",
                stage, video.filename
            ))
        })
}
