// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prompt Library
//!
//! System prompts live as template files compiled into the binary, one per
//! task. A configured prompt directory overrides any of them by file name
//! (`correct_subtitle.system.txt`, `title.system.txt`, …), which lets users
//! tune prompts without rebuilding.
//!
//! User queries are built in code as JSON values — the query shape is part
//! of the provider contract, not something to template. Message builders
//! here are pure: everything they need (metadata value, terms accumulator,
//! rosters) is passed in explicitly.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;
use uuid::Uuid;

use aurora_domain::entities::Term;
use aurora_domain::services::{ChatMessage, TaskType};

const CORRECT_SUBTITLE_SYSTEM: &str = include_str!("templates/correct_subtitle.system.txt");
const TRANSLATE_SUBTITLE_SYSTEM: &str = include_str!("templates/translate_subtitle.system.txt");
const DIRECTOR_SYSTEM: &str = include_str!("templates/director.system.txt");
const ACTOR_SYSTEM: &str = include_str!("templates/actor.system.txt");
const CATEGORY_SYSTEM: &str = include_str!("templates/category.system.txt");
const STUDIO_SYSTEM: &str = include_str!("templates/studio.system.txt");
const TITLE_SYSTEM: &str = include_str!("templates/title.system.txt");
const SYNOPSIS_SYSTEM: &str = include_str!("templates/synopsis.system.txt");

/// Reminder appended to simple-metadata system prompts; the paired UUID
/// prefix on user messages defeats KV-cache aliasing across look-alike
/// queries.
const UUID_HINT: &str = "\n用户的查询会以uuid开头，请忽略它";

/// Per-task system prompts with optional on-disk overrides.
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    /// Few-shot examples per task: (user, assistant) pairs.
    examples: HashMap<TaskType, Vec<(String, String)>>,
}

impl PromptLibrary {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            examples: HashMap::new(),
        }
    }

    fn template_file(task: TaskType) -> &'static str {
        match task {
            TaskType::MetadataDirector => "director.system.txt",
            TaskType::MetadataActor => "actor.system.txt",
            TaskType::MetadataCategory => "category.system.txt",
            TaskType::MetadataStudio => "studio.system.txt",
            TaskType::MetadataTitle => "title.system.txt",
            TaskType::MetadataSynopsis => "synopsis.system.txt",
            TaskType::CorrectSubtitle => "correct_subtitle.system.txt",
            TaskType::TranslateSubtitle => "translate_subtitle.system.txt",
        }
    }

    fn embedded(task: TaskType) -> &'static str {
        match task {
            TaskType::MetadataDirector => DIRECTOR_SYSTEM,
            TaskType::MetadataActor => ACTOR_SYSTEM,
            TaskType::MetadataCategory => CATEGORY_SYSTEM,
            TaskType::MetadataStudio => STUDIO_SYSTEM,
            TaskType::MetadataTitle => TITLE_SYSTEM,
            TaskType::MetadataSynopsis => SYNOPSIS_SYSTEM,
            TaskType::CorrectSubtitle => CORRECT_SUBTITLE_SYSTEM,
            TaskType::TranslateSubtitle => TRANSLATE_SUBTITLE_SYSTEM,
        }
    }

    /// System prompt for a task, preferring the override directory.
    pub fn system_prompt(&self, task: TaskType) -> String {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(Self::template_file(task));
            match std::fs::read_to_string(&path) {
                Ok(content) => return content,
                Err(err) if path.exists() => {
                    warn!("Failed to read prompt override {}: {}", path.display(), err);
                }
                Err(_) => {}
            }
        }
        Self::embedded(task).to_string()
    }

    pub fn examples(&self, task: TaskType) -> &[(String, String)] {
        self.examples.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Simple metadata message list: system + examples + UUID-prefixed user
    /// query.
    pub fn simple_metadata_messages(&self, task: TaskType, text: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(format!(
            "{}{}",
            self.system_prompt(task),
            UUID_HINT
        ))];
        for (question, answer) in self.examples(task) {
            messages.push(ChatMessage::user(format!("{} {}", Uuid::new_v4(), question)));
            messages.push(ChatMessage::assistant(answer.clone()));
        }
        messages.push(ChatMessage::user(format!("{} {}", Uuid::new_v4(), text)));
        messages
    }

    /// Title / synopsis message list with the performer rosters injected.
    pub fn contextual_metadata_messages(
        &self,
        task: TaskType,
        text: &str,
        actors: &[serde_json::Value],
        actresses: &[serde_json::Value],
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt(task))];
        for (question, answer) in self.examples(task) {
            messages.push(ChatMessage::user(question.clone()));
            messages.push(ChatMessage::assistant(answer.clone()));
        }

        let command = match task {
            TaskType::MetadataSynopsis => "请为我翻译这段影片简介",
            _ => "请为我翻译这个影片标题",
        };
        let field = match task {
            TaskType::MetadataSynopsis => "synopsis",
            _ => "title",
        };
        let query = serde_json::json!({
            "command": command,
            field: text,
            "actors": actors,
            "actresses": actresses,
        });
        messages.push(ChatMessage::user(pretty_json(&query)));
        messages
    }

    /// Subtitle message list for one chain node: slice text plus the
    /// running terms accumulator.
    pub fn subtitle_messages(
        &self,
        task: TaskType,
        metadata: Option<&serde_json::Value>,
        terms: &[Term],
        node_text: &str,
    ) -> Vec<ChatMessage> {
        let metadata = metadata.cloned().unwrap_or(serde_json::Value::Null);
        let query = match task {
            TaskType::CorrectSubtitle => serde_json::json!({
                "command": "请为我校正这份srt字幕",
                "movie_info": {
                    "source": "这部影片的来源是一部日本成人电影",
                    "metadata": metadata,
                    "terms": terms,
                },
                "instruction": "在校正时，请注意保留成人电影中露骨的台词，原汁原味地呈现.",
                "srt_block": node_text,
                "additional": "展示改动内容和原因",
            }),
            _ => serde_json::json!({
                "command": "请为我翻译这份srt字幕",
                "movie_info": {
                    "source": "这部影片的来源是一部日本成人电影",
                    "metadata": metadata,
                    "terms": terms,
                },
                "instruction": "在翻译时，请注意保留成人电影中露骨的台词，原汁原味地呈现",
                "srt_block": node_text,
            }),
        };
        vec![
            ChatMessage::system(self.system_prompt(task)),
            ChatMessage::user(pretty_json(&query)),
        ]
    }
}

fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_prompts_are_nonempty() {
        let library = PromptLibrary::new(None);
        for task in [
            TaskType::MetadataDirector,
            TaskType::MetadataActor,
            TaskType::MetadataCategory,
            TaskType::MetadataStudio,
            TaskType::MetadataTitle,
            TaskType::MetadataSynopsis,
            TaskType::CorrectSubtitle,
            TaskType::TranslateSubtitle,
        ] {
            assert!(!library.system_prompt(task).trim().is_empty());
        }
    }

    #[test]
    fn test_override_dir_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("director.system.txt"), "custom prompt").unwrap();
        let library = PromptLibrary::new(Some(dir.path().to_path_buf()));
        assert_eq!(library.system_prompt(TaskType::MetadataDirector), "custom prompt");
        // Tasks without an override fall back to the embedded template.
        assert!(library
            .system_prompt(TaskType::MetadataActor)
            .contains("演员"));
    }

    #[test]
    fn test_simple_metadata_messages_carry_uuid_prefix() {
        let library = PromptLibrary::new(None);
        let messages = library.simple_metadata_messages(TaskType::MetadataActor, "星宮一花");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("uuid"));
        // 36-char UUID, a space, then the query text.
        let user = &messages[1].content;
        assert!(user.ends_with("星宮一花"));
        assert!(Uuid::parse_str(&user[..36]).is_ok());
    }

    #[test]
    fn test_two_calls_never_share_a_user_message() {
        let library = PromptLibrary::new(None);
        let a = library.simple_metadata_messages(TaskType::MetadataActor, "星宮一花");
        let b = library.simple_metadata_messages(TaskType::MetadataActor, "星宮一花");
        assert_ne!(a[1].content, b[1].content);
    }

    #[test]
    fn test_subtitle_messages_embed_terms() {
        let library = PromptLibrary::new(None);
        let terms = vec![Term::new("ウエムラ", "上村")];
        let messages = library.subtitle_messages(
            TaskType::CorrectSubtitle,
            None,
            &terms,
            "1\n00:00:01,000 --> 00:00:02,000\nこんにちは\n",
        );
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("ウエムラ"));
        assert!(messages[1].content.contains("srt_block"));
    }
}
