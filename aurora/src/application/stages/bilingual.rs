// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Terminal stage: corrected + translated SRT → `<filename>.ass`.
//!
//! The corrected source subtitle is the blueprint; a missing or broken
//! translated track degrades to source-only dialogue lines rather than
//! failing the stage.

use async_trait::async_trait;
use tracing::{info, warn};

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::value_objects::VideoStage;

use crate::infrastructure::services::bilingual_render::render_bilingual_ass;

use super::{required_by_product, StageContext, VideoStageRunner};

pub struct BilingualSubtitleStage;

#[async_trait]
impl VideoStageRunner for BilingualSubtitleStage {
    fn stage(&self) -> VideoStage {
        VideoStage::BilingualSubtitle
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let source_path = match required_by_product(video, VideoStage::CorrectSubtitle) {
            Ok(path) => path,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };
        let source_srt = tokio::fs::read_to_string(&source_path).await?;

        let translated_srt = match video.by_product(VideoStage::TranslateSubtitle) {
            Some(path) if path.exists() => Some(tokio::fs::read_to_string(path).await?),
            _ => {
                warn!(
                    "No translated subtitle for {}; rendering source-only",
                    video.filename
                );
                None
            }
        };

        let title = match movie.metadata.as_ref().and_then(|m| m.title.as_ref()) {
            Some(title) => format!("{} - {}", movie.code, title.preferred()),
            None => movie.code_string(),
        };

        let ass = match render_bilingual_ass(
            &source_srt,
            translated_srt.as_deref(),
            &title,
            movie.metadata.as_ref(),
        ) {
            Ok(ass) => ass,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };

        let output = ctx.movie_dir(movie).join(format!("{}.ass", video.filename));
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output, &ass).await?;
        info!("Bilingual subtitle saved to {}", output.display());

        video.set_stage(self.stage(), StageStatus::Success, Some(output));
        Ok(())
    }
}
