// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LLM Provider Port
//!
//! A [`Provider`] is one chat endpoint plus policy: retry on transient
//! failures, immediate return on request-level failures, and a monotonic
//! circuit breaker on provider-fatal failures. The contract is deliberately
//! strict about error flow — `chat` never fails out-of-band. Every outcome,
//! including exhausted retries, is a [`ChatResult`] whose `error` field
//! carries the classified [`ChatErrorKind`].
//!
//! `time_taken_ms` covers the full retry loop wall time, not just the final
//! attempt; `attempt_count` counts every wire call made.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatErrorKind;

/// One chat message in OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Per-call knobs, resolved by the strategy layer.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature; absent means provider default.
    pub temperature: Option<f32>,
    /// Resolved streaming preference. Recorded for observability; the wire
    /// request is non-streaming regardless.
    pub stream: bool,
    /// Ask for `response_format: {"type": "json_object"}`.
    pub json_response: bool,
    /// Per-call timeout override; absent means the provider's configured
    /// timeout.
    pub timeout: Option<Duration>,
}

/// Outcome of one `chat` call, retries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResult {
    pub success: bool,
    /// Wire calls made, including retries.
    pub attempt_count: u32,
    /// End-to-end wall time for the whole retry loop.
    pub time_taken_ms: u64,
    pub content: Option<String>,
    pub error: Option<ChatErrorKind>,
}

impl ChatResult {
    /// A successful result carrying content.
    pub fn ok(attempt_count: u32, time_taken_ms: u64, content: String) -> Self {
        Self {
            success: true,
            attempt_count,
            time_taken_ms,
            content: Some(content),
            error: None,
        }
    }

    /// A failed result carrying the classified error kind.
    pub fn err(attempt_count: u32, time_taken_ms: u64, kind: ChatErrorKind) -> Self {
        Self {
            success: false,
            attempt_count,
            time_taken_ms,
            content: None,
            error: Some(kind),
        }
    }
}

/// One LLM endpoint with retry and circuit-breaking policy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model identifier, used in logs and the streaming-model set.
    fn model(&self) -> &str;

    /// Circuit-breaker state. Transitions are monotonic true → false; once
    /// false every subsequent call fails fast without touching the wire.
    fn available(&self) -> bool;

    /// Sends a chat completion request, applying retry policy.
    async fn chat(&self, messages: &[ChatMessage], options: &ChatOptions) -> ChatResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }

    #[test]
    fn test_chat_result_constructors() {
        let ok = ChatResult::ok(2, 1500, "hello".into());
        assert!(ok.success);
        assert_eq!(ok.attempt_count, 2);
        assert!(ok.error.is_none());

        let err = ChatResult::err(3, 24_000, ChatErrorKind::Timeout);
        assert!(!err.success);
        assert_eq!(err.error, Some(ChatErrorKind::Timeout));
        assert!(err.content.is_none());
    }
}
