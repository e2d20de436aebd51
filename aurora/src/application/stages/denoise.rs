// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Denoising stage: extracted WAV → `<filename>.denoised.wav`.

use async_trait::async_trait;
use tracing::info;

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::services::Denoiser;
use aurora_domain::value_objects::VideoStage;

use super::{required_by_product, StageContext, VideoStageRunner};

use std::sync::Arc;

pub struct DenoiseAudioStage {
    denoiser: Arc<dyn Denoiser>,
}

impl DenoiseAudioStage {
    pub fn new(denoiser: Arc<dyn Denoiser>) -> Self {
        Self { denoiser }
    }
}

#[async_trait]
impl VideoStageRunner for DenoiseAudioStage {
    fn stage(&self) -> VideoStage {
        VideoStage::DenoiseAudio
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let input = match required_by_product(video, VideoStage::ExtractAudio) {
            Ok(input) => input,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };

        let output = ctx
            .movie_dir(movie)
            .join(format!("{}.denoised.wav", video.filename));

        if output.exists() {
            info!("Denoised audio already exists: {}", output.display());
            video.set_stage(self.stage(), StageStatus::Success, Some(output));
            return Ok(());
        }

        match self.denoiser.denoise(&input, &output).await {
            Ok(()) => {
                video.set_stage(self.stage(), StageStatus::Success, Some(output));
                Ok(())
            }
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                Err(err)
            }
        }
    }
}
