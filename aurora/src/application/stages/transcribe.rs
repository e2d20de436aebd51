// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Transcription stage: vocals WAV → `<filename>.srt`, gated by the
//! three-part quality check with a bounded number of re-transcriptions.

use async_trait::async_trait;
use tracing::{info, warn};

use aurora_domain::entities::{Movie, StageStatus, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::services::Transcriber;
use aurora_domain::value_objects::VideoStage;

use crate::infrastructure::adapters::QualityChecker;

use super::{required_by_product, StageContext, VideoStageRunner};

use std::sync::Arc;

pub struct TranscribeAudioStage {
    transcriber: Arc<dyn Transcriber>,
    quality: Arc<QualityChecker>,
    max_retries: u32,
}

impl TranscribeAudioStage {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        quality: Arc<QualityChecker>,
        max_retries: u32,
    ) -> Self {
        Self {
            transcriber,
            quality,
            max_retries: max_retries.max(1),
        }
    }
}

#[async_trait]
impl VideoStageRunner for TranscribeAudioStage {
    fn stage(&self) -> VideoStage {
        VideoStage::TranscribeAudio
    }

    async fn execute(
        &self,
        movie: &mut Movie,
        video: &mut Video,
        ctx: &StageContext,
    ) -> Result<(), AuroraError> {
        let input = match required_by_product(video, VideoStage::DenoiseAudio) {
            Ok(input) => input,
            Err(err) => {
                video.set_stage(self.stage(), StageStatus::Failed, None);
                return Err(err);
            }
        };

        let output = ctx.movie_dir(movie).join(format!("{}.srt", video.filename));

        if output.exists() {
            info!("Transcription already exists: {}", output.display());
            video.set_stage(self.stage(), StageStatus::Success, Some(output));
            return Ok(());
        }

        for attempt in 1..=self.max_retries {
            info!(
                "Transcribing {} (attempt {}/{})",
                video.filename, attempt, self.max_retries
            );
            if let Err(err) = self.transcriber.transcribe(&input, &output).await {
                warn!("Transcription attempt {} failed: {}", attempt, err);
                continue;
            }

            let text = tokio::fs::read_to_string(&output).await?;
            if self.quality.check(&text).await {
                video.set_stage(self.stage(), StageStatus::Success, Some(output));
                return Ok(());
            }

            warn!(
                "Transcription of {} failed quality gates; discarding attempt {}",
                video.filename, attempt
            );
            let _ = tokio::fs::remove_file(&output).await;
        }

        video.set_stage(self.stage(), StageStatus::Failed, None);
        Err(AuroraError::ProcessingFailed(format!(
            "Transcription failed quality gates after {} attempts for {}",
            self.max_retries, video.filename
        )))
    }
}
