// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Whisper Transcription Adapter
//!
//! Shells out to the whisper CLI for WAV → SRT. Whisper writes
//! `<input stem>.srt` into the requested output directory; the adapter
//! moves it onto the contract path when the names differ.
//!
//! Quality gating (format / cue-gap / LLM judgement) lives in the
//! transcription stage, not here — the adapter's contract is "produce an
//! SRT file or fail".

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use aurora_domain::error::AuroraError;
use aurora_domain::services::Transcriber;

use super::ffmpeg::run_with_timeout;

const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

/// whisper-CLI-backed transcriber.
pub struct WhisperTranscriber {
    whisper: String,
    model_size: String,
    language: String,
}

impl WhisperTranscriber {
    pub fn new(
        whisper: impl Into<String>,
        model_size: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            whisper: whisper.into(),
            model_size: model_size.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, input: &Path, output: &Path) -> Result<(), AuroraError> {
        let out_dir = output
            .parent()
            .ok_or_else(|| {
                AuroraError::ProcessingFailed(format!(
                    "Output path has no parent: {}",
                    output.display()
                ))
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&out_dir).await?;

        info!(
            "Transcribing {} with whisper ({}, {})",
            input.display(),
            self.model_size,
            self.language
        );
        let mut command = Command::new(&self.whisper);
        command
            .arg(input)
            .arg("--model")
            .arg(&self.model_size)
            .arg("--language")
            .arg(&self.language)
            .arg("--output_format")
            .arg("srt")
            .arg("--output_dir")
            .arg(&out_dir);

        let result = run_with_timeout(command, TRANSCRIBE_TIMEOUT, "whisper").await?;
        if !result.status.success() {
            return Err(AuroraError::ProcessingFailed(format!(
                "whisper returned {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr)
            )));
        }

        // Whisper names the file after the input stem.
        let produced = out_dir.join(format!(
            "{}.srt",
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
        ));
        if produced != output {
            if !produced.exists() {
                return Err(AuroraError::ProcessingFailed(format!(
                    "whisper produced no SRT at {}",
                    produced.display()
                )));
            }
            tokio::fs::rename(&produced, output).await?;
        } else if !output.exists() {
            return Err(AuroraError::ProcessingFailed(format!(
                "whisper produced no SRT at {}",
                output.display()
            )));
        }

        info!("Transcribed subtitle written to {}", output.display());
        Ok(())
    }
}
