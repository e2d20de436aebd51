// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Translation Orchestrator
//!
//! Task-typed façade over the provider fleet. Callers never touch
//! providers or strategies directly; they ask for an operation
//! (`correct_subtitle`, `translate_title`, …) and get one
//! [`ProcessResult`] back.
//!
//! Routing per task: the configured provider list is tried strictly in
//! order; for each provider a strategy is selected (subtitle tasks get the
//! slicing best-effort engine unless `slice: false`, simple metadata gets
//! the UUID-prefixed single call, title/synopsis get the roster-aware
//! prompt); the first successful result wins and the rest of the list is
//! never consulted. When every provider fails the caller receives an
//! unsuccessful result — the orchestrator never errors out-of-band.
//!
//! The streaming flag resolves per call: an explicit per-task `stream`
//! override wins, otherwise membership of the provider's model in the
//! global `streaming_models` set decides.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use aurora_domain::entities::Term;
use aurora_domain::services::{ProcessResult, Provider, TaskType, TranslateContext};

use super::prompts::PromptLibrary;
use super::strategy::{
    ContextualMetadataStrategy, NoSliceSubtitleStrategy, SimpleMetadataStrategy,
    SliceSubtitleStrategy, TranslateStrategy,
};

/// Default slice sizes, in cues, when the config does not override them.
const DEFAULT_CORRECT_SLICE: usize = 500;
const DEFAULT_TRANSLATE_SLICE: usize = 550;

/// Per-task strategy knobs.
#[derive(Debug, Clone, Default)]
pub struct StrategySettings {
    pub slice: Option<bool>,
    pub size: Option<usize>,
}

/// Everything configured for one task type.
pub struct TaskSettings {
    pub providers: Vec<Arc<dyn Provider>>,
    pub stream: Option<bool>,
    pub temperature: Option<f32>,
    pub strategy: StrategySettings,
}

/// Routes (task, context) to a strategy and an ordered provider list.
pub struct TranslateOrchestrator {
    tasks: HashMap<TaskType, TaskSettings>,
    streaming_models: Vec<String>,
    prompts: Arc<PromptLibrary>,
}

impl TranslateOrchestrator {
    pub fn new(
        tasks: HashMap<TaskType, TaskSettings>,
        streaming_models: Vec<String>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            tasks,
            streaming_models,
            prompts,
        }
    }

    // ========== Task-typed entry points ==========

    /// Corrects a transcribed SRT against the movie's metadata and
    /// accumulated terms.
    pub async fn correct_subtitle(
        &self,
        text: &str,
        metadata: Option<serde_json::Value>,
        terms: &[Term],
    ) -> ProcessResult {
        let mut context = TranslateContext::new(TaskType::CorrectSubtitle, text);
        context.metadata = metadata;
        context.terms = terms.to_vec();
        self.process_task(context).await
    }

    /// Translates a corrected SRT into Chinese.
    pub async fn translate_subtitle(
        &self,
        text: &str,
        metadata: Option<serde_json::Value>,
        terms: &[Term],
    ) -> ProcessResult {
        let mut context = TranslateContext::new(TaskType::TranslateSubtitle, text);
        context.metadata = metadata;
        context.terms = terms.to_vec();
        self.process_task(context).await
    }

    /// Translates the title; the prompt references the performer rosters.
    pub async fn translate_title(
        &self,
        text: &str,
        actors: Vec<serde_json::Value>,
        actresses: Vec<serde_json::Value>,
    ) -> ProcessResult {
        let mut context = TranslateContext::new(TaskType::MetadataTitle, text);
        context.actors = actors;
        context.actresses = actresses;
        self.process_task(context).await
    }

    /// Translates the synopsis; the prompt references the performer rosters.
    pub async fn translate_synopsis(
        &self,
        text: &str,
        actors: Vec<serde_json::Value>,
        actresses: Vec<serde_json::Value>,
    ) -> ProcessResult {
        let mut context = TranslateContext::new(TaskType::MetadataSynopsis, text);
        context.actors = actors;
        context.actresses = actresses;
        self.process_task(context).await
    }

    /// Translates a simple metadata field (director, actor, category,
    /// studio).
    pub async fn translate_generic_metadata(&self, task: TaskType, text: &str) -> ProcessResult {
        self.process_task(TranslateContext::new(task, text)).await
    }

    // ========== Routing ==========

    async fn process_task(&self, context: TranslateContext) -> ProcessResult {
        let task = context.task_type;
        let Some(settings) = self.tasks.get(&task) else {
            warn!("No providers configured for task '{}'", task);
            return ProcessResult::failure(task);
        };
        if settings.providers.is_empty() {
            warn!("Empty provider list for task '{}'", task);
            return ProcessResult::failure(task);
        }

        for provider in &settings.providers {
            let strategy = self.select_strategy(provider.as_ref(), task, settings);
            let result = strategy.process(provider.as_ref(), &context).await;
            if result.success {
                return result;
            }
            info!(
                "Provider {} failed task '{}'; trying next",
                provider.model(),
                task
            );
        }

        warn!("All providers failed task '{}'", task);
        ProcessResult::failure(task)
    }

    fn resolve_stream(&self, provider: &dyn Provider, settings: &TaskSettings) -> bool {
        settings
            .stream
            .unwrap_or_else(|| self.streaming_models.iter().any(|m| m == provider.model()))
    }

    fn select_strategy(
        &self,
        provider: &dyn Provider,
        task: TaskType,
        settings: &TaskSettings,
    ) -> Box<dyn TranslateStrategy> {
        let stream = self.resolve_stream(provider, settings);
        let temperature = settings.temperature;

        if task.is_subtitle() {
            let default_size = match task {
                TaskType::TranslateSubtitle => DEFAULT_TRANSLATE_SLICE,
                _ => DEFAULT_CORRECT_SLICE,
            };
            let slice_enabled = settings.strategy.slice.unwrap_or(true);
            let slice_size = settings.strategy.size.unwrap_or(default_size);
            if slice_enabled {
                Box::new(SliceSubtitleStrategy::new(
                    self.prompts.clone(),
                    slice_size,
                    stream,
                    temperature,
                ))
            } else {
                Box::new(NoSliceSubtitleStrategy::new(
                    self.prompts.clone(),
                    stream,
                    temperature,
                ))
            }
        } else if task.is_simple_metadata() {
            Box::new(SimpleMetadataStrategy::new(
                self.prompts.clone(),
                stream,
                temperature,
            ))
        } else {
            Box::new(ContextualMetadataStrategy::new(
                self.prompts.clone(),
                stream,
                temperature,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aurora_domain::error::ChatErrorKind;
    use aurora_domain::services::{ChatMessage, ChatOptions, ChatResult};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CannedProvider {
        model: String,
        result: ChatResult,
        calls: AtomicU32,
    }

    impl CannedProvider {
        fn ok(model: &str, content: &str) -> Arc<Self> {
            Arc::new(Self {
                model: model.into(),
                result: ChatResult::ok(1, 5, content.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn failing(model: &str) -> Arc<Self> {
            Arc::new(Self {
                model: model.into(),
                result: ChatResult::err(3, 5, ChatErrorKind::Timeout),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn model(&self) -> &str {
            &self.model
        }

        fn available(&self) -> bool {
            true
        }

        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> ChatResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn orchestrator_with(providers: Vec<Arc<dyn Provider>>) -> TranslateOrchestrator {
        let mut tasks = HashMap::new();
        tasks.insert(
            TaskType::MetadataActor,
            TaskSettings {
                providers,
                stream: None,
                temperature: None,
                strategy: StrategySettings::default(),
            },
        );
        TranslateOrchestrator::new(tasks, vec![], Arc::new(PromptLibrary::new(None)))
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins() {
        let bad = CannedProvider::failing("bad-model");
        let good = CannedProvider::ok("good-model", "译文");
        let orchestrator =
            orchestrator_with(vec![bad.clone() as Arc<dyn Provider>, good.clone()]);

        let result = orchestrator
            .translate_generic_metadata(TaskType::MetadataActor, "原文")
            .await;

        assert!(result.success);
        assert_eq!(result.content.as_deref(), Some("译文"));
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_provider_skipped_when_first_succeeds() {
        let first = CannedProvider::ok("first", "译文");
        let second = CannedProvider::ok("second", "别的");
        let orchestrator =
            orchestrator_with(vec![first.clone() as Arc<dyn Provider>, second.clone()]);

        let result = orchestrator
            .translate_generic_metadata(TaskType::MetadataActor, "原文")
            .await;

        assert!(result.success);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_providers_failing_returns_failure() {
        let orchestrator = orchestrator_with(vec![
            CannedProvider::failing("a") as Arc<dyn Provider>,
            CannedProvider::failing("b"),
        ]);

        let result = orchestrator
            .translate_generic_metadata(TaskType::MetadataActor, "原文")
            .await;

        assert!(!result.success);
        assert_eq!(result.task_type, Some(TaskType::MetadataActor));
    }

    #[tokio::test]
    async fn test_unconfigured_task_fails_cleanly() {
        let orchestrator = orchestrator_with(vec![]);
        let result = orchestrator
            .translate_generic_metadata(TaskType::MetadataDirector, "監督")
            .await;
        assert!(!result.success);
    }

    #[test]
    fn test_stream_resolution() {
        let provider = CannedProvider::ok("streamy", "x");
        let mut tasks = HashMap::new();
        tasks.insert(
            TaskType::MetadataActor,
            TaskSettings {
                providers: vec![provider.clone() as Arc<dyn Provider>],
                stream: None,
                temperature: None,
                strategy: StrategySettings::default(),
            },
        );
        let orchestrator = TranslateOrchestrator::new(
            tasks,
            vec!["streamy".into()],
            Arc::new(PromptLibrary::new(None)),
        );
        let settings = orchestrator.tasks.get(&TaskType::MetadataActor).unwrap();

        // Model membership decides when no per-task override exists.
        assert!(orchestrator.resolve_stream(provider.as_ref(), settings));

        // The per-task override wins.
        let overridden = TaskSettings {
            providers: vec![],
            stream: Some(false),
            temperature: None,
            strategy: StrategySettings::default(),
        };
        assert!(!orchestrator.resolve_stream(provider.as_ref(), &overridden));
    }
}
