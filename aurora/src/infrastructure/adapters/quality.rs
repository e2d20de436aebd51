// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transcription Quality Gates
//!
//! Whisper output that passes format muster can still be garbage — looping
//! hallucinations, silence transcribed as filler, broken cue sequencing.
//! [`QualityChecker`] runs three gates, all of which must pass:
//!
//! 1. **format** — sequence numbers and timestamps parse as SRT;
//! 2. **rule** — no gap between successive cues exceeds the configured
//!    interval (seconds). Hour-long silent stretches mean the model
//!    skipped audio;
//! 3. **LLM** — a low-cost model judges a sample and answers
//!    `{"qualified": bool, "reason"?: string}`. Both an unparseable
//!    verdict and a failed call count as qualified: the gate exists to
//!    catch obvious garbage, not to block the pipeline when the judge is
//!    down.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use aurora_domain::services::{ChatMessage, ChatOptions, Provider};
use aurora_domain::subtitle;

const JUDGE_SYSTEM_PROMPT: &str = r#"You are an ultra-fast subtitle quality check API. Your task is to determine if a subtitle file is structurally broken based on a small sample. Your response must be immediate and only in the specified JSON format.

**Analysis Criteria (Based ONLY on the sample):**
1. **Structural Damage:** Is the file completely missing timestamps (`-->`) or is the sequence number logic broken?
2. **Unusable Garbage:** Is the text composed of random characters, encoding errors, or ONLY meaningless non-dialogue placeholders in the entire sample?

**IMPORTANT: Do NOT fail a file for these reasons (These are ACCEPTABLE):**
- **Natural Conversation:** Common conversational fillers/interjections in Japanese are NORMAL and indicate a good transcription.
- **Time Gaps:** Large gaps in timestamps between subtitle entries are NORMAL and simply mean there is no dialogue in that part of the video.
- **Advertisements:** The presence of ads at the beginning or end is acceptable.

**Output Format (Your entire response MUST be ONLY this valid JSON object):**
- If the sample appears usable for further processing: `{"qualified": true}`
- If the sample is structurally broken or pure garbage: `{"qualified": false, "reason": "A very brief, 10-word max explanation."}`"#;

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default = "default_qualified")]
    qualified: bool,
    #[serde(default)]
    reason: Option<String>,
}

fn default_qualified() -> bool {
    true
}

/// Three-gate transcription quality check.
pub struct QualityChecker {
    judge: Option<Arc<dyn Provider>>,
    /// Maximum allowed inter-cue gap, seconds.
    interval: f64,
}

impl QualityChecker {
    pub fn new(judge: Option<Arc<dyn Provider>>, interval: f64) -> Self {
        Self { judge, interval }
    }

    /// Gate 1: indices and timestamps parse, and at least one cue exists.
    pub fn format_check(&self, text: &str) -> bool {
        match subtitle::parse_srt(text) {
            Ok(cues) if !cues.is_empty() => true,
            Ok(_) => {
                warn!("Subtitle is empty");
                false
            }
            Err(err) => {
                warn!("Subtitle failed format check: {}", err);
                false
            }
        }
    }

    /// Gate 2: no inter-cue gap above the configured interval.
    pub fn rule_check(&self, text: &str) -> bool {
        let cues = match subtitle::parse_srt(text) {
            Ok(cues) => cues,
            Err(_) => return false,
        };
        if cues.len() < 2 {
            return true;
        }

        let mut max_gap: f64 = 0.0;
        for pair in cues.windows(2) {
            let gap = pair[1].start_ms.saturating_sub(pair[0].end_ms) as f64 / 1000.0;
            max_gap = max_gap.max(gap);
        }
        info!("Maximum inter-cue gap: {:.1}s", max_gap);

        if max_gap > self.interval {
            warn!(
                "Maximum gap {:.1}s exceeds the {:.1}s threshold",
                max_gap, self.interval
            );
            return false;
        }
        true
    }

    /// Gate 3: LLM verdict; optimistic on judge failure.
    pub async fn llm_check(&self, text: &str) -> bool {
        let Some(judge) = &self.judge else {
            return true;
        };

        let user_query = serde_json::json!({
            "info": "这是一个成人影片的视频字幕",
            "text": text,
        });
        let messages = vec![
            ChatMessage::system(JUDGE_SYSTEM_PROMPT),
            ChatMessage::user(user_query.to_string()),
        ];
        let options = ChatOptions {
            temperature: Some(0.0),
            json_response: true,
            ..Default::default()
        };

        info!("Checking subtitle quality with low-cost LLM");
        let result = judge.chat(&messages, &options).await;
        if !result.success {
            warn!("Quality judge call failed; counting as qualified");
            return true;
        }

        let Some(content) = result.content else {
            return true;
        };
        match serde_json::from_str::<Verdict>(&content) {
            Ok(verdict) => {
                if !verdict.qualified {
                    warn!(
                        "LLM quality check failed: {}",
                        verdict.reason.unwrap_or_else(|| "no reason given".into())
                    );
                }
                verdict.qualified
            }
            Err(err) => {
                warn!("Unparseable quality verdict ({}); counting as qualified", err);
                true
            }
        }
    }

    /// All three gates must pass.
    pub async fn check(&self, text: &str) -> bool {
        self.format_check(text) && self.rule_check(text) && self.llm_check(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aurora_domain::services::ChatResult;

    struct FixedJudge {
        reply: String,
    }

    #[async_trait]
    impl Provider for FixedJudge {
        fn model(&self) -> &str {
            "judge"
        }

        fn available(&self) -> bool {
            true
        }

        async fn chat(&self, _messages: &[ChatMessage], _options: &ChatOptions) -> ChatResult {
            ChatResult::ok(1, 1, self.reply.clone())
        }
    }

    const GOOD_SRT: &str =
        "1\n00:00:01,000 --> 00:00:02,000\nこんにちは\n\n2\n00:00:03,000 --> 00:00:04,000\nはい";

    fn checker(interval: f64) -> QualityChecker {
        QualityChecker::new(None, interval)
    }

    #[test]
    fn test_format_check() {
        assert!(checker(30.0).format_check(GOOD_SRT));
        assert!(!checker(30.0).format_check(""));
        assert!(!checker(30.0).format_check("not a subtitle"));
    }

    #[test]
    fn test_rule_check_gap_threshold() {
        // Gap between cue 1 end (2s) and cue 2 start (3s) is 1 second.
        assert!(checker(30.0).rule_check(GOOD_SRT));
        assert!(!checker(0.5).rule_check(GOOD_SRT));
    }

    #[test]
    fn test_rule_check_single_cue_passes() {
        let one = "1\n00:00:01,000 --> 00:00:02,000\nこんにちは";
        assert!(checker(0.1).rule_check(one));
    }

    #[tokio::test]
    async fn test_llm_check_verdicts() {
        let pass = QualityChecker::new(
            Some(Arc::new(FixedJudge {
                reply: r#"{"qualified": true}"#.into(),
            })),
            30.0,
        );
        assert!(pass.llm_check(GOOD_SRT).await);

        let fail = QualityChecker::new(
            Some(Arc::new(FixedJudge {
                reply: r#"{"qualified": false, "reason": "garbage"}"#.into(),
            })),
            30.0,
        );
        assert!(!fail.llm_check(GOOD_SRT).await);
    }

    #[tokio::test]
    async fn test_llm_check_defaults_qualified_on_parse_failure() {
        let broken = QualityChecker::new(
            Some(Arc::new(FixedJudge {
                reply: "definitely not json".into(),
            })),
            30.0,
        );
        assert!(broken.llm_check(GOOD_SRT).await);
    }

    #[tokio::test]
    async fn test_all_gates() {
        assert!(checker(30.0).check(GOOD_SRT).await);
        assert!(!checker(30.0).check("garbage").await);
    }
}
