// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Audio extraction stage: video → `<filename>.extract.wav`.

use async_trait::async_trait;
use tracing::info;

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::services::AudioExtractor;
use aurora_domain::value_objects::VideoStage;

use super::{StageContext, VideoStageRunner};

use std::sync::Arc;

pub struct ExtractAudioStage {
    extractor: Arc<dyn AudioExtractor>,
}

impl ExtractAudioStage {
    pub fn new(extractor: Arc<dyn AudioExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl VideoStageRunner for ExtractAudioStage {
    fn stage(&self) -> VideoStage {
        VideoStage::ExtractAudio
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let output = ctx
            .movie_dir(movie)
            .join(format!("{}.extract.wav", video.filename));

        // An artifact from an interrupted run is taken at face value; the
        // reconciliation kernel already unlinked anything untrustworthy.
        if output.exists() {
            info!("Audio file already exists: {}", output.display());
            video.set_stage(self.stage(), StageStatus::Success, Some(output));
            return Ok(());
        }

        match self.extractor.extract(&video.absolute_path, &output).await {
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
