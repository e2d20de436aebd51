// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FFmpeg Audio Extraction Adapter
//!
//! Shells out to ffmpeg for the video → mono 16 kHz WAV transform and to
//! ffprobe for duration verification. The produced audio must sit within
//! 180 seconds of the video duration; a mismatch means ffmpeg bailed out
//! midway (truncated container, dead stream), so the partial output is
//! deleted and the stage fails rather than feeding a half file downstream.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{error, info, warn};

use aurora_domain::error::AuroraError;
use aurora_domain::services::AudioExtractor;

/// Hard ceiling for one extraction run.
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(3600);
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum tolerated |video - audio| duration difference, seconds.
const DURATION_TOLERANCE_SECS: f64 = 180.0;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Runs a prepared command with a timeout, killing it on expiry.
pub(crate) async fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    what: &str,
) -> Result<std::process::Output, AuroraError> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    command.kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|err| AuroraError::ProcessingFailed(format!("Cannot spawn {}: {}", what, err)))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(AuroraError::ProcessingFailed(format!(
            "{} failed to run: {}",
            what, err
        ))),
        Err(_) => Err(AuroraError::TimeoutError(format!(
            "{} exceeded {:?}",
            what, timeout
        ))),
    }
}

/// ffmpeg/ffprobe-backed audio extractor.
pub struct FfmpegAudioExtractor {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegAudioExtractor {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Media duration in seconds via ffprobe, or None when unprobeable.
    pub async fn probe_duration(&self, path: &Path) -> Option<f64> {
        let mut command = Command::new(&self.ffprobe);
        command
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("json")
            .arg(path);

        let output = match run_with_timeout(command, PROBE_TIMEOUT, "ffprobe").await {
            Ok(output) => output,
            Err(err) => {
                warn!("ffprobe failed for {}: {}", path.display(), err);
                return None;
            }
        };
        if !output.status.success() {
            warn!(
                "ffprobe returned {} for {}: {}",
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
            return None;
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout).ok()?;
        parsed.format?.duration?.parse::<f64>().ok()
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, video: &Path, output: &Path) -> Result<(), AuroraError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Extracting audio from {}", video.display());
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(video)
            .arg("-vn")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-y")
            .arg(output);

        let result = run_with_timeout(command, EXTRACT_TIMEOUT, "ffmpeg").await?;
        if !result.status.success() {
            return Err(AuroraError::ProcessingFailed(format!(
                "ffmpeg returned {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr)
            )));
        }
        if !output.exists() {
            return Err(AuroraError::ProcessingFailed(format!(
                "ffmpeg produced no output at {}",
                output.display()
            )));
        }

        // Duration verification: a short WAV means extraction died midway.
        let video_duration = self.probe_duration(video).await;
        let audio_duration = self.probe_duration(output).await;
        match (video_duration, audio_duration) {
            (None, _) => {
                warn!(
                    "Cannot probe video duration for {}; skipping duration check",
                    video.display()
                );
            }
            (Some(_), None) => {
                let _ = tokio::fs::remove_file(output).await;
                return Err(AuroraError::ProcessingFailed(format!(
                    "Cannot probe extracted audio duration for {}",
                    output.display()
                )));
            }
            (Some(v), Some(a)) => {
                let diff = (v - a).abs();
                if diff > DURATION_TOLERANCE_SECS {
                    error!(
                        "Duration mismatch for {}: video={:.2}s audio={:.2}s diff={:.2}s",
                        video.display(),
                        v,
                        a,
                        diff
                    );
                    let _ = tokio::fs::remove_file(output).await;
                    return Err(AuroraError::ProcessingFailed(format!(
                        "Extracted audio duration deviates by {:.0}s (limit {}s)",
                        diff, DURATION_TOLERANCE_SECS
                    )));
                }
                info!(
                    "Duration check passed: video={:.2}s audio={:.2}s diff={:.2}s",
                    v, a, diff
                );
            }
        }

        info!("Extracted audio to {}", output.display());
        Ok(())
    }
}
