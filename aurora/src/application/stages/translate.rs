// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Translation stage: corrected SRT → `<filename>.translated.srt`.
//! Critical — a failed translation halts the video.

use async_trait::async_trait;
use tracing::info;

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::value_objects::VideoStage;

use super::{required_by_product, StageContext, VideoStageRunner};

pub struct TranslateSubtitleStage;

#[async_trait]
impl VideoStageRunner for TranslateSubtitleStage {
    fn stage(&self) -> VideoStage {
        VideoStage::TranslateSubtitle
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let input = match required_by_product(video, VideoStage::CorrectSubtitle) {
            Ok(input) => input,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };
        let corrected_srt = tokio::fs::read_to_string(&input).await?;

        let metadata_value = movie.metadata.as_ref().map(|m| m.to_prompt_value());
        let result = ctx
            .translator
            .translate_subtitle(&corrected_srt, metadata_value, &movie.terms)
            .await;

        if !result.success {
            video.set_stage(self.stage(), StageStatus::Failed, None);
            return Err(AuroraError::ProcessingFailed(format!(
                "Subtitle translation failed for {}",
                video.filename
            )));
        }

        let translated = result.content.unwrap_or_default();
        let output = ctx
            .movie_dir(movie)
            .join(format!("{}.translated.srt", video.filename));
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output, &translated).await?;
        info!("Translated subtitle saved to {}", output.display());

        video.set_stage(self.stage(), StageStatus::Success, Some(output));
        Ok(())
    }
}
