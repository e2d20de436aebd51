// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Stage Identifiers
//!
//! [`VideoStage`] names the fixed, ordered sequence of per-video
//! transformations. The order is load-bearing: the reconciliation kernel
//! scans it to find the break index, and the execution loop walks it
//! front to back. [`VideoStage::ORDER`] is the single source of truth.
//!
//! Movie-level stages are currently just the scrape stage; it is identified
//! by [`MOVIE_STAGE_SCRAPE`] rather than an enum of one.
//!
//! # Examples
//!
//! ```
//! use aurora_domain::value_objects::VideoStage;
//! use std::str::FromStr;
//!
//! assert_eq!(VideoStage::ORDER.len(), 6);
//! assert_eq!(VideoStage::ORDER[0], VideoStage::ExtractAudio);
//! assert_eq!(VideoStage::terminal(), VideoStage::BilingualSubtitle);
//!
//! let stage = VideoStage::from_str("correct_subtitle").unwrap();
//! assert_eq!(stage, VideoStage::CorrectSubtitle);
//! assert_eq!(format!("{}", stage), "correct_subtitle");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AuroraError;

/// Name of the movie-level scrape stage.
pub const MOVIE_STAGE_SCRAPE: &str = "scrape";

/// The fixed per-video stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoStage {
    /// Video file to mono 16 kHz WAV
    ExtractAudio,
    /// Raw WAV to vocals-only WAV
    DenoiseAudio,
    /// Vocals WAV to source-language SRT
    TranscribeAudio,
    /// Transcribed SRT to corrected SRT plus glossary terms
    CorrectSubtitle,
    /// Corrected SRT to translated SRT
    TranslateSubtitle,
    /// Corrected + translated SRT to the bilingual ASS asset
    BilingualSubtitle,
}

impl VideoStage {
    /// Declared execution order. Reconciliation and dispatch both walk this
    /// slice; nothing else defines stage order.
    pub const ORDER: [VideoStage; 6] = [
        VideoStage::ExtractAudio,
        VideoStage::DenoiseAudio,
        VideoStage::TranscribeAudio,
        VideoStage::CorrectSubtitle,
        VideoStage::TranslateSubtitle,
        VideoStage::BilingualSubtitle,
    ];

    /// The terminal stage, whose artifact enables the terminal optimization.
    pub fn terminal() -> VideoStage {
        *VideoStage::ORDER.last().expect("stage order is non-empty")
    }

    /// Stable snake_case name used as the `stage_name` database key.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStage::ExtractAudio => "extract_audio",
            VideoStage::DenoiseAudio => "denoise_audio",
            VideoStage::TranscribeAudio => "transcribe_audio",
            VideoStage::CorrectSubtitle => "correct_subtitle",
            VideoStage::TranslateSubtitle => "translate_subtitle",
            VideoStage::BilingualSubtitle => "bilingual_subtitle",
        }
    }

    /// Position in [`VideoStage::ORDER`].
    pub fn index(&self) -> usize {
        VideoStage::ORDER
            .iter()
            .position(|s| s == self)
            .expect("every stage appears in ORDER")
    }
}

impl std::fmt::Display for VideoStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoStage {
    type Err = AuroraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract_audio" => Ok(VideoStage::ExtractAudio),
            "denoise_audio" => Ok(VideoStage::DenoiseAudio),
            "transcribe_audio" => Ok(VideoStage::TranscribeAudio),
            "correct_subtitle" => Ok(VideoStage::CorrectSubtitle),
            "translate_subtitle" => Ok(VideoStage::TranslateSubtitle),
            "bilingual_subtitle" => Ok(VideoStage::BilingualSubtitle),
            _ => Err(AuroraError::ValidationError(format!("Unknown stage name: {}", s))),
        }
    }
}
