// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Translation Task Types and Results
//!
//! The orchestrator routes a [`TranslateContext`] — task type plus whatever
//! context that task needs — through a strategy to one or more provider
//! calls, and reports back a single [`ProcessResult`].
//!
//! [`SubtitlePayload`] is the parsed form of the provider JSON contract for
//! subtitle tasks: `{content, success, error?, differences?, terms?}`. The
//! best-effort engine parses each node's response into this shape, merges
//! fresh terms into the running accumulator, and aggregates contents.

use serde::{Deserialize, Serialize};

use crate::entities::term::Term;

/// Everything the orchestrator can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    MetadataDirector,
    MetadataActor,
    MetadataCategory,
    MetadataStudio,
    MetadataTitle,
    MetadataSynopsis,
    CorrectSubtitle,
    TranslateSubtitle,
}

impl TaskType {
    /// Config key for the per-task provider table.
    pub fn config_key(&self) -> &'static str {
        match self {
            TaskType::MetadataDirector => "director",
            TaskType::MetadataActor => "actor",
            TaskType::MetadataCategory => "category",
            TaskType::MetadataStudio => "studio",
            TaskType::MetadataTitle => "title",
            TaskType::MetadataSynopsis => "synopsis",
            TaskType::CorrectSubtitle => "correct",
            TaskType::TranslateSubtitle => "subtitle",
        }
    }

    /// Subtitle tasks run the best-effort slicing engine.
    pub fn is_subtitle(&self) -> bool {
        matches!(self, TaskType::CorrectSubtitle | TaskType::TranslateSubtitle)
    }

    /// Simple metadata tasks need no context beyond the text itself.
    pub fn is_simple_metadata(&self) -> bool {
        matches!(
            self,
            TaskType::MetadataDirector
                | TaskType::MetadataActor
                | TaskType::MetadataCategory
                | TaskType::MetadataStudio
        )
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config_key())
    }
}

/// Typed context handed from the orchestrator to a strategy.
#[derive(Debug, Clone)]
pub struct TranslateContext {
    pub task_type: TaskType,
    /// Prompt `movie_info.metadata` value for subtitle tasks.
    pub metadata: Option<serde_json::Value>,
    /// Running glossary accumulator; later slices see terms discovered by
    /// earlier ones.
    pub terms: Vec<Term>,
    pub text_to_process: String,
    /// Actor roster entries for title / synopsis prompts.
    pub actors: Vec<serde_json::Value>,
    pub actresses: Vec<serde_json::Value>,
}

impl TranslateContext {
    pub fn new(task_type: TaskType, text: impl Into<String>) -> Self {
        Self {
            task_type,
            metadata: None,
            terms: Vec::new(),
            text_to_process: text.into(),
            actors: Vec::new(),
            actresses: Vec::new(),
        }
    }

    /// Merges fresh terms into the accumulator, keyed on `japanese`.
    ///
    /// Existing entries win, so a term keeps its first established
    /// translation for the rest of the traversal.
    pub fn merge_terms(&mut self, fresh: &[Term]) -> usize {
        let mut seen: std::collections::HashSet<String> =
            self.terms.iter().map(|t| t.origin.clone()).collect();
        let mut added = 0;
        for term in fresh {
            if seen.insert(term.origin.clone()) {
                self.terms.push(term.clone());
                added += 1;
            }
        }
        added
    }
}

/// One correction the LLM reported for a cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub index: u32,
    pub original: String,
    pub corrected: String,
    pub reason: String,
}

/// Parsed provider JSON contract for subtitle tasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtitlePayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub differences: Vec<Difference>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

impl SubtitlePayload {
    /// Parses a raw response body; lenient about absent optional fields.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Aggregate outcome of one orchestrated task.
#[derive(Debug, Clone, Default)]
pub struct ProcessResult {
    pub task_type: Option<TaskType>,
    /// Total provider wire calls, retries and splits included.
    pub attempt_count: u32,
    /// Strategy-level wall time, milliseconds.
    pub time_taken_ms: u64,
    pub content: Option<String>,
    pub differences: Vec<Difference>,
    pub terms: Vec<Term>,
    pub success: bool,
}

impl ProcessResult {
    /// The canonical all-providers-failed result.
    pub fn failure(task_type: TaskType) -> Self {
        Self {
            task_type: Some(task_type),
            ..Default::default()
        }
    }
}
