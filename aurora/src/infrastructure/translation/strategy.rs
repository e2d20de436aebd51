// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Translation Strategies
//!
//! A strategy converts one typed context into provider calls and a single
//! [`ProcessResult`]:
//!
//! - [`SimpleMetadataStrategy`] — director / actor / category / studio.
//!   One call; the user message carries a fresh UUID prefix so look-alike
//!   queries never alias in provider-side KV caches.
//! - [`ContextualMetadataStrategy`] — title / synopsis, with the performer
//!   rosters injected so names stay consistent with earlier translations.
//! - [`SliceSubtitleStrategy`] / [`NoSliceSubtitleStrategy`] — subtitle
//!   correction and translation over the best-effort block chain.
//!
//! ## Best-effort processing
//!
//! The chain is traversed strictly head-to-tail. Each unprocessed node gets
//! one chat call carrying its SRT fragment plus the running terms
//! accumulator; terms returned by earlier nodes are visible to later ones,
//! which is what keeps names consistent across slices. On failure a node
//! with at least [`SPLIT_THRESHOLD`] cues is split into three even parts
//! that are retried in place; smaller nodes record their failure and the
//! traversal moves on. Aggregation keeps whatever succeeded: contents are
//! concatenated, cue indices renumbered from 1, differences and terms
//! collected, and the result counts as success if any content survived.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use aurora_domain::entities::Term;
use aurora_domain::services::{
    ChatOptions, ChatResult, ProcessResult, Provider, SubtitlePayload, TranslateContext,
};
use aurora_domain::subtitle;

use super::chain::BlockChain;
use super::prompts::PromptLibrary;

/// Minimum cue count for a failed node to be worth splitting.
const SPLIT_THRESHOLD: usize = 10;

/// Subtitle calls run long; metadata calls use the provider default.
const SUBTITLE_TIMEOUT: Duration = Duration::from_secs(500);

/// Strategy interface: one context in, one aggregated result out.
#[async_trait]
pub trait TranslateStrategy: Send + Sync {
    async fn process(&self, provider: &dyn Provider, context: &TranslateContext) -> ProcessResult;
}

/// Fast-fail check shared by every strategy.
fn circuit_breaker_check(
    provider: &dyn Provider,
    context: &TranslateContext,
) -> Option<ProcessResult> {
    if !provider.available() {
        warn!(
            "Provider {} is unavailable (circuit breaker), failing fast",
            provider.model()
        );
        return Some(ProcessResult::failure(context.task_type));
    }
    None
}

fn result_from_chat(context: &TranslateContext, chat: ChatResult) -> ProcessResult {
    ProcessResult {
        task_type: Some(context.task_type),
        attempt_count: chat.attempt_count,
        time_taken_ms: chat.time_taken_ms,
        success: chat.success,
        content: chat.content,
        differences: Vec::new(),
        terms: Vec::new(),
    }
}

/// Director / actor / category / studio: system prompt, few-shot examples,
/// one UUID-prefixed user message.
pub struct SimpleMetadataStrategy {
    prompts: Arc<PromptLibrary>,
    stream: bool,
    temperature: Option<f32>,
}

impl SimpleMetadataStrategy {
    pub fn new(prompts: Arc<PromptLibrary>, stream: bool, temperature: Option<f32>) -> Self {
        Self {
            prompts,
            stream,
            temperature,
        }
    }
}

#[async_trait]
impl TranslateStrategy for SimpleMetadataStrategy {
    async fn process(&self, provider: &dyn Provider, context: &TranslateContext) -> ProcessResult {
        if let Some(result) = circuit_breaker_check(provider, context) {
            return result;
        }
        let messages = self
            .prompts
            .simple_metadata_messages(context.task_type, &context.text_to_process);
        let options = ChatOptions {
            temperature: self.temperature,
            stream: self.stream,
            ..Default::default()
        };
        result_from_chat(context, provider.chat(&messages, &options).await)
    }
}

/// Title / synopsis: the prompt references the movie's performer rosters.
pub struct ContextualMetadataStrategy {
    prompts: Arc<PromptLibrary>,
    stream: bool,
    temperature: Option<f32>,
}

impl ContextualMetadataStrategy {
    pub fn new(prompts: Arc<PromptLibrary>, stream: bool, temperature: Option<f32>) -> Self {
        Self {
            prompts,
            stream,
            temperature,
        }
    }
}

#[async_trait]
impl TranslateStrategy for ContextualMetadataStrategy {
    async fn process(&self, provider: &dyn Provider, context: &TranslateContext) -> ProcessResult {
        if let Some(result) = circuit_breaker_check(provider, context) {
            return result;
        }
        let messages = self.prompts.contextual_metadata_messages(
            context.task_type,
            &context.text_to_process,
            &context.actors,
            &context.actresses,
        );
        let options = ChatOptions {
            temperature: self.temperature,
            stream: self.stream,
            ..Default::default()
        };
        result_from_chat(context, provider.chat(&messages, &options).await)
    }
}

/// Shared best-effort engine over an already-built chain.
async fn process_chain(
    provider: &dyn Provider,
    context: &TranslateContext,
    prompts: &PromptLibrary,
    mut chain: BlockChain,
    stream: bool,
    temperature: Option<f32>,
) -> ProcessResult {
    let start = Instant::now();
    let task = context.task_type;
    let options = ChatOptions {
        temperature,
        stream,
        json_response: true,
        timeout: Some(SUBTITLE_TIMEOUT),
    };

    // Terms discovered by earlier nodes feed later ones.
    let mut accumulator = TranslateContext {
        terms: context.terms.clone(),
        ..TranslateContext::new(task, "")
    };

    let mut total_attempts = 0u32;
    let mut prev: Option<usize> = None;
    let mut current = chain.head();

    while let Some(idx) = current {
        if chain.node(idx).is_processed {
            prev = Some(idx);
            current = chain.next(idx);
            continue;
        }

        info!("Processing subtitle node with {} cues", chain.cue_count(idx));
        let messages = prompts.subtitle_messages(
            task,
            context.metadata.as_ref(),
            &accumulator.terms,
            &chain.node(idx).origin,
        );
        let result = provider.chat(&messages, &options).await;
        total_attempts += result.attempt_count;

        if result.success {
            if let Some(content) = &result.content {
                match SubtitlePayload::parse(content) {
                    Ok(payload) => {
                        let added = accumulator.merge_terms(&payload.terms);
                        if added > 0 {
                            info!("Accumulated {} new terms for later slices", added);
                        }
                    }
                    Err(err) => warn!("Node response is not valid payload JSON: {}", err),
                }
            }
            chain.mark_processed(idx, result);
            prev = Some(idx);
            current = chain.next(idx);
        } else {
            let cues = chain.cue_count(idx);
            warn!("Node processing failed, cue count: {}", cues);
            if cues >= SPLIT_THRESHOLD {
                info!("Splitting node into 3 parts");
                let first = chain.split_into_three(idx, prev);
                current = Some(first);
            } else {
                // Too small to split; keep the failure and move on.
                chain.mark_processed(idx, result);
                prev = Some(idx);
                current = chain.next(idx);
            }
        }
    }

    aggregate(&chain, context, total_attempts, start.elapsed().as_millis() as u64)
}

/// Collects content, differences and terms from every successful node.
fn aggregate(
    chain: &BlockChain,
    context: &TranslateContext,
    attempt_count: u32,
    time_taken_ms: u64,
) -> ProcessResult {
    let mut contents: Vec<String> = Vec::new();
    let mut differences = Vec::new();
    let mut terms: Vec<Term> = Vec::new();

    for idx in chain.iter_indices() {
        let node = chain.node(idx);
        let Some(processed) = &node.processed else {
            continue;
        };
        if !processed.success {
            continue;
        }
        let Some(raw) = &processed.content else {
            continue;
        };
        match SubtitlePayload::parse(raw) {
            Ok(payload) => {
                if let Some(content) = payload.content {
                    contents.push(content.trim_end().to_string());
                }
                differences.extend(payload.differences);
                terms.extend(payload.terms);
            }
            Err(err) => warn!("Skipping unparseable node payload: {}", err),
        }
    }

    let content = if contents.is_empty() {
        None
    } else {
        Some(subtitle::renumber(&contents.join("\n\n")))
    };

    ProcessResult {
        task_type: Some(context.task_type),
        attempt_count,
        time_taken_ms,
        success: content.is_some(),
        content,
        differences,
        terms,
    }
}

/// Pre-splits the input into balanced slices before best-effort traversal.
pub struct SliceSubtitleStrategy {
    prompts: Arc<PromptLibrary>,
    slice_size: usize,
    stream: bool,
    temperature: Option<f32>,
}

impl SliceSubtitleStrategy {
    pub fn new(
        prompts: Arc<PromptLibrary>,
        slice_size: usize,
        stream: bool,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            prompts,
            slice_size,
            stream,
            temperature,
        }
    }
}

#[async_trait]
impl TranslateStrategy for SliceSubtitleStrategy {
    async fn process(&self, provider: &dyn Provider, context: &TranslateContext) -> ProcessResult {
        if let Some(result) = circuit_breaker_check(provider, context) {
            return result;
        }
        let slices = subtitle::adaptive_slice(&context.text_to_process, self.slice_size);
        let chain = BlockChain::from_slices(slices);
        process_chain(
            provider,
            context,
            &self.prompts,
            chain,
            self.stream,
            self.temperature,
        )
        .await
    }
}

/// Whole input as one node; splitting still applies on failure.
pub struct NoSliceSubtitleStrategy {
    prompts: Arc<PromptLibrary>,
    stream: bool,
    temperature: Option<f32>,
}

impl NoSliceSubtitleStrategy {
    pub fn new(prompts: Arc<PromptLibrary>, stream: bool, temperature: Option<f32>) -> Self {
        Self {
            prompts,
            stream,
            temperature,
        }
    }
}

#[async_trait]
impl TranslateStrategy for NoSliceSubtitleStrategy {
    async fn process(&self, provider: &dyn Provider, context: &TranslateContext) -> ProcessResult {
        if let Some(result) = circuit_breaker_check(provider, context) {
            return result;
        }
        let chain = BlockChain::single(&context.text_to_process);
        process_chain(
            provider,
            context,
            &self.prompts,
            chain,
            self.stream,
            self.temperature,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_domain::error::ChatErrorKind;
    use aurora_domain::services::{ChatMessage, TaskType};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider returning scripted results and recording every message list.
    struct ScriptedProvider {
        script: Mutex<VecDeque<ChatResult>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
        available: bool,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ChatResult>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                available: true,
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted"
        }

        fn available(&self) -> bool {
            self.available
        }

        async fn chat(&self, messages: &[ChatMessage], _options: &ChatOptions) -> ChatResult {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ChatResult::err(1, 0, ChatErrorKind::Other))
        }
    }

    fn srt(range: std::ops::RangeInclusive<usize>) -> String {
        range
            .map(|i| {
                format!(
                    "{}\n00:{:02}:{:02},000 --> 00:{:02}:{:02},500\nline {}",
                    i,
                    i / 60,
                    i % 60,
                    i / 60,
                    i % 60,
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn payload_result(srt_content: &str, terms: serde_json::Value) -> ChatResult {
        let body = serde_json::json!({
            "content": srt_content,
            "success": true,
            "terms": terms,
        });
        ChatResult::ok(1, 10, body.to_string())
    }

    fn context(text: &str) -> TranslateContext {
        TranslateContext::new(TaskType::CorrectSubtitle, text)
    }

    fn prompts() -> Arc<PromptLibrary> {
        Arc::new(PromptLibrary::new(None))
    }

    #[tokio::test]
    async fn test_failed_node_splits_and_recovers() {
        // One 30-cue node fails, its three 10-cue thirds succeed.
        let provider = ScriptedProvider::new(vec![
            ChatResult::err(3, 100, ChatErrorKind::LengthLimit),
            payload_result(&srt(1..=10), serde_json::json!([])),
            payload_result(&srt(11..=20), serde_json::json!([])),
            payload_result(&srt(21..=30), serde_json::json!([])),
        ]);
        let strategy = SliceSubtitleStrategy::new(prompts(), 30, false, None);

        let result = strategy.process(&provider, &context(&srt(1..=30))).await;

        assert!(result.success);
        assert_eq!(result.attempt_count, 6);
        let cues = subtitle::parse_srt(result.content.as_deref().unwrap()).unwrap();
        assert_eq!(cues.len(), 30);
        // Renumbered 1..N with no gaps.
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.index as usize, i + 1);
        }
    }

    #[tokio::test]
    async fn test_small_node_failure_is_recorded_not_split() {
        let provider = ScriptedProvider::new(vec![ChatResult::err(3, 50, ChatErrorKind::Timeout)]);
        let strategy = NoSliceSubtitleStrategy::new(prompts(), false, None);

        let result = strategy.process(&provider, &context(&srt(1..=5))).await;

        assert!(!result.success);
        assert!(result.content.is_none());
        // One node, one chat call; no splitting below the threshold.
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terms_flow_into_later_slices() {
        let provider = ScriptedProvider::new(vec![
            payload_result(
                &srt(1..=2),
                serde_json::json!([{"japanese": "ウエムラ", "recommended_chinese": "上村"}]),
            ),
            payload_result(&srt(3..=4), serde_json::json!([])),
        ]);
        let strategy = SliceSubtitleStrategy::new(prompts(), 2, false, None);

        let result = strategy.process(&provider, &context(&srt(1..=4))).await;
        assert!(result.success);
        assert_eq!(result.terms.len(), 1);

        // The second call's user message must already carry the new term.
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0][1].content.contains("ウエムラ"));
        assert!(calls[1][1].content.contains("ウエムラ"));
    }

    #[tokio::test]
    async fn test_partial_success_keeps_what_survived() {
        // First slice succeeds, second (5 cues) fails for good.
        let provider = ScriptedProvider::new(vec![
            payload_result(&srt(1..=5), serde_json::json!([])),
            ChatResult::err(3, 10, ChatErrorKind::Timeout),
        ]);
        let strategy = SliceSubtitleStrategy::new(prompts(), 5, false, None);

        let result = strategy.process(&provider, &context(&srt(1..=10))).await;

        assert!(result.success);
        let cues = subtitle::parse_srt(result.content.as_deref().unwrap()).unwrap();
        assert_eq!(cues.len(), 5);
    }

    #[tokio::test]
    async fn test_circuit_breaker_fast_fail() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.available = false;
        let strategy = SimpleMetadataStrategy::new(prompts(), false, None);

        let result = strategy
            .process(
                &provider,
                &TranslateContext::new(TaskType::MetadataActor, "星宮一花"),
            )
            .await;

        assert!(!result.success);
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_simple_metadata_single_call() {
        let provider = ScriptedProvider::new(vec![ChatResult::ok(1, 5, "星宫一花".into())]);
        let strategy = SimpleMetadataStrategy::new(prompts(), false, Some(0.2));

        let result = strategy
            .process(
                &provider,
                &TranslateContext::new(TaskType::MetadataActor, "星宮一花"),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.content.as_deref(), Some("星宫一花"));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }
}
