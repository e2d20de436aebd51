// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # OpenAI-Compatible Chat Provider
//!
//! [`OpenAiProvider`] speaks the `POST {base_url}/chat/completions` wire
//! format against any OpenAI-compatible endpoint. Policy lives here, not in
//! the strategies:
//!
//! - **Retry** — up to three attempts with a fixed 8 s delay, only for
//!   kinds classified retryable (timeout, connection, 5xx, 408,
//!   non-quota 429, empty choices);
//! - **Circuit breaker** — provider-fatal kinds (auth, permission,
//!   not-found, quota, HTTP 401/402/403/404) flip `available` to false for
//!   the rest of the process; later calls fail fast without touching the
//!   wire;
//! - **Classification** — every failure maps onto one `ChatErrorKind`, and
//!   `finish_reason` maps `length` → `LengthLimit`, `content_filter` →
//!   `ContentFilter`.
//!
//! The request is always non-streaming. The resolved stream flag arrives in
//! the options for observability, but streaming responses proved too
//! unreliable to assemble across the proxy endpoints this runs against.
//!
//! `chat` never fails out-of-band; every outcome is a [`ChatResult`] and
//! `time_taken_ms` spans the entire retry loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use aurora_domain::error::ChatErrorKind;
use aurora_domain::services::{ChatMessage, ChatOptions, ChatResult, Provider};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(8);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(500);

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// What one wire attempt produced.
enum Attempt {
    Done(ChatResult),
    Retry(ChatErrorKind),
}

/// One OpenAI-compatible endpoint plus retry/circuit-breaker policy.
pub struct OpenAiProvider {
    model: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
    available: AtomicBool,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            client: reqwest::Client::new(),
            available: AtomicBool::new(true),
        }
    }

    fn trip_breaker(&self, kind: ChatErrorKind) {
        error!(
            "Provider {} disabled for the rest of the run ({})",
            self.model, kind
        );
        self.available.store(false, Ordering::SeqCst);
    }

    /// Classifies an HTTP status into an error kind, reading the body for
    /// the quota marker on 429.
    fn classify_status(status: u16, body: &str) -> ChatErrorKind {
        match status {
            401 => ChatErrorKind::AuthenticationError,
            402 => ChatErrorKind::InsufficientQuota,
            403 => ChatErrorKind::PermissionDenied,
            404 => ChatErrorKind::NotFound,
            400 | 422 => ChatErrorKind::UnprocessableEntity,
            413 => ChatErrorKind::PayloadTooLarge,
            429 => {
                let lowered = body.to_ascii_lowercase();
                if lowered.contains("insufficient_quota") || lowered.contains("quota") {
                    ChatErrorKind::InsufficientQuota
                } else {
                    ChatErrorKind::RateLimit
                }
            }
            // 408, 5xx and anything unexpected: retry and hope.
            _ => ChatErrorKind::Other,
        }
    }

    async fn attempt(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
        attempt_no: u32,
    ) -> Attempt {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if options.json_response {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let timeout = options.timeout.unwrap_or(self.timeout);
        debug!(
            "Sending request to {} (attempt {}/{}, timeout {:?})",
            self.model, attempt_no, MAX_ATTEMPTS, timeout
        );

        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                warn!("Request to {} timed out: {}", self.model, err);
                return Attempt::Retry(ChatErrorKind::Timeout);
            }
            Err(err) => {
                warn!("Request to {} failed: {}", self.model, err);
                return Attempt::Retry(ChatErrorKind::ConnectionError);
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                warn!("Reading response from {} failed: {}", self.model, err);
                return Attempt::Retry(ChatErrorKind::ConnectionError);
            }
        };

        if !(200..300).contains(&status) {
            let kind = Self::classify_status(status, &text);
            error!("HTTP {} from {}: {}", status, self.model, kind);
            return if kind.is_retryable() {
                Attempt::Retry(kind)
            } else {
                Attempt::Done(ChatResult::err(attempt_no, 0, kind))
            };
        }

        let parsed: CompletionResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Malformed completion body from {}: {}", self.model, err);
                return Attempt::Retry(ChatErrorKind::Other);
            }
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            // Empty choices are usually a transient upstream hiccup.
            warn!("No choices in response from {}", self.model);
            return Attempt::Retry(ChatErrorKind::Other);
        };

        let content = choice.message.content.unwrap_or_default();
        match choice.finish_reason.as_deref() {
            Some("length") => {
                warn!("Response from {} truncated at the length limit", self.model);
                Attempt::Done(ChatResult::err(attempt_no, 0, ChatErrorKind::LengthLimit))
            }
            Some("content_filter") => {
                warn!("Response from {} blocked by content filter", self.model);
                Attempt::Done(ChatResult::err(attempt_no, 0, ChatErrorKind::ContentFilter))
            }
            other => {
                if !matches!(other, Some("stop")) {
                    warn!("Unexpected finish_reason from {}: {:?}", self.model, other);
                }
                Attempt::Done(ChatResult::ok(attempt_no, 0, content.trim().to_string()))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> ChatResult {
        if !self.available() {
            warn!(
                "Provider {} is unavailable due to a previous irrecoverable error",
                self.model
            );
            return ChatResult::err(0, 0, ChatErrorKind::Other);
        }

        if options.stream {
            debug!(
                "Streaming requested for {}; sending non-streaming request",
                self.model
            );
        }

        let start = Instant::now();
        let mut attempt_no = 0u32;
        let mut last_kind = ChatErrorKind::Other;

        while attempt_no < MAX_ATTEMPTS {
            attempt_no += 1;
            match self.attempt(messages, options, attempt_no).await {
                Attempt::Done(mut result) => {
                    result.time_taken_ms = start.elapsed().as_millis() as u64;
                    if let Some(kind) = result.error {
                        if kind.is_circuit_breaking() {
                            self.trip_breaker(kind);
                        }
                    } else {
                        info!(
                            "Provider {} answered in {} ms ({} attempts)",
                            self.model, result.time_taken_ms, attempt_no
                        );
                    }
                    return result;
                }
                Attempt::Retry(kind) => {
                    last_kind = kind;
                    if attempt_no < MAX_ATTEMPTS {
                        info!(
                            "Retrying {} in {:?} ({}/{}, {})",
                            self.model, RETRY_DELAY, attempt_no, MAX_ATTEMPTS, kind
                        );
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        error!("All retry attempts exhausted for {}", self.model);
        ChatResult::err(
            attempt_no,
            start.elapsed().as_millis() as u64,
            last_kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            OpenAiProvider::classify_status(401, ""),
            ChatErrorKind::AuthenticationError
        );
        assert_eq!(
            OpenAiProvider::classify_status(402, ""),
            ChatErrorKind::InsufficientQuota
        );
        assert_eq!(
            OpenAiProvider::classify_status(403, ""),
            ChatErrorKind::PermissionDenied
        );
        assert_eq!(OpenAiProvider::classify_status(404, ""), ChatErrorKind::NotFound);
        assert_eq!(
            OpenAiProvider::classify_status(400, ""),
            ChatErrorKind::UnprocessableEntity
        );
        assert_eq!(
            OpenAiProvider::classify_status(413, ""),
            ChatErrorKind::PayloadTooLarge
        );
        assert_eq!(OpenAiProvider::classify_status(500, ""), ChatErrorKind::Other);
        assert_eq!(OpenAiProvider::classify_status(408, ""), ChatErrorKind::Other);
    }

    #[test]
    fn test_429_quota_detection() {
        assert_eq!(
            OpenAiProvider::classify_status(429, r#"{"error": "insufficient_quota"}"#),
            ChatErrorKind::InsufficientQuota
        );
        assert_eq!(
            OpenAiProvider::classify_status(429, "slow down"),
            ChatErrorKind::RateLimit
        );
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_fast() {
        let provider = OpenAiProvider::new("key", "http://127.0.0.1:1", "test-model", None);
        provider.available.store(false, Ordering::SeqCst);

        let result = provider
            .chat(&[ChatMessage::user("hi")], &ChatOptions::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_breaker_is_monotonic() {
        let provider = OpenAiProvider::new("key", "http://127.0.0.1:1", "test-model", None);
        assert!(provider.available());
        provider.trip_breaker(ChatErrorKind::AuthenticationError);
        assert!(!provider.available());
        // Nothing flips it back.
        provider.trip_breaker(ChatErrorKind::NotFound);
        assert!(!provider.available());
    }
}
