// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Subprocess adapters over external tooling (ffmpeg, demucs, whisper)
//! plus the transcription quality gates.

pub mod demucs;
pub mod ffmpeg;
pub mod quality;
pub mod whisper;

pub use demucs::DemucsDenoiser;
pub use ffmpeg::FfmpegAudioExtractor;
pub use quality::QualityChecker;
pub use whisper::WhisperTranscriber;
