// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio and Transcription Adapter Ports
//!
//! Opaque transformers over external tooling. Each consumes and produces a
//! file path; the pipeline stages own by-product naming and status
//! bookkeeping, the adapters own the subprocess contract:
//!
//! - [`AudioExtractor`] — video → mono 16 kHz WAV, verified against the
//!   video duration (±180 s), partial output deleted on mismatch;
//! - [`Denoiser`] — WAV → vocals-only WAV;
//! - [`Transcriber`] — WAV → source-language SRT text.
//!
//! Transcription quality gating (format / rule / LLM) sits above the
//! `Transcriber` in the stage, not inside the adapter.

use std::path::Path;

use async_trait::async_trait;

use crate::error::AuroraError;

/// Video → mono 16 kHz WAV.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extracts the audio track to `output`.
    ///
    /// # Errors
    ///
    /// `ProcessingFailed` when the tool fails or the produced duration
    /// deviates from the video duration by more than 180 seconds (the
    /// partial output is removed); `TimeoutError` after one hour.
    async fn extract(&self, video: &Path, output: &Path) -> Result<(), AuroraError>;
}

/// WAV → vocals-only WAV.
#[async_trait]
pub trait Denoiser: Send + Sync {
    /// # Errors
    ///
    /// `ProcessingFailed` on tool failure; `TimeoutError` after two hours.
    async fn denoise(&self, input: &Path, output: &Path) -> Result<(), AuroraError>;
}

/// WAV → source-language SRT.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes `input` and writes SRT to `output`.
    async fn transcribe(&self, input: &Path, output: &Path) -> Result<(), AuroraError>;
}
