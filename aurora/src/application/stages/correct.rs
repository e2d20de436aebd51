// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Correction stage: transcribed SRT → `<filename>.corrected.srt`.
//!
//! The orchestrator corrects against the movie's metadata and its
//! accumulated glossary; terms the LLM discovered flow back into the
//! movie so later videos of the same title reuse them. Correction is
//! critical — a failed correction halts the video.

use async_trait::async_trait;
use tracing::info;

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::value_objects::VideoStage;

use super::{required_by_product, StageContext, VideoStageRunner};

pub struct CorrectSubtitleStage;

#[async_trait]
impl VideoStageRunner for CorrectSubtitleStage {
    fn stage(&self) -> VideoStage {
        VideoStage::CorrectSubtitle
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let input = match required_by_product(video, VideoStage::TranscribeAudio) {
            Ok(input) => input,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };
        let raw_srt = tokio::fs::read_to_string(&input).await?;

        let metadata_value = movie.metadata.as_ref().map(|m| m.to_prompt_value());
        let result = ctx
            .translator
            .correct_subtitle(&raw_srt, metadata_value, &movie.terms)
            .await;

        if !result.success {
            video.set_stage(self.stage(), StageStatus::Failed, None);
            return Err(AuroraError::ProcessingFailed(format!(
                "Subtitle correction failed for {}",
                video.filename
            )));
        }

        let corrected = result.content.unwrap_or_default();
        let output = ctx
            .movie_dir(movie)
            .join(format!("{}.corrected.srt", video.filename));
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output, &corrected).await?;
        info!("Corrected subtitle saved to {}", output.display());

        let added = movie.merge_terms(result.terms);
        if added > 0 {
            info!("Movie {} gained {} glossary terms", movie.code, added);
        }

        video.set_stage(self.stage(), StageStatus::Success, Some(output));
        Ok(())
    }
}
