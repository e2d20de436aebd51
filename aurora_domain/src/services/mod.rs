// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Service ports: async traits implemented by the infrastructure layer,
//! plus the task and result types that cross those boundaries.

pub mod adapters;
pub mod provider;
pub mod scraper;
pub mod translation;

pub use adapters::{AudioExtractor, Denoiser, Transcriber};
pub use provider::{ChatMessage, ChatOptions, ChatResult, Provider};
pub use scraper::WebScraper;
pub use translation::{
    Difference, ProcessResult, SubtitlePayload, TaskType, TranslateContext,
};
