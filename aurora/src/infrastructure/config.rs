// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Typed Configuration Tree
//!
//! One YAML document describes the whole deployment: directories, scraper
//! sites, the per-task provider tables for the translation orchestrator,
//! and the transcriber with its quality checker. This module owns the
//! serde shapes, the `ENV_` indirection, and the factories that turn config
//! nodes into live services.
//!
//! String values may reference the environment: a leading `ENV_` prefix
//! resolves the remainder as a variable name at construction time
//! (`api_key: ENV_OPENROUTER_API_KEY`). A missing variable fails the
//! affected provider's construction — secrets never default silently.
//!
//! ```yaml
//! output_dir: ./output
//! scrapers:
//!   - service: missav
//!     base_url: https://missav.live
//! translate_orchestrator:
//!   streaming_models: [google/gemini-2.5-pro]
//!   config:
//!     correct:
//!       providers:
//!         - service: openai
//!           model: google/gemini-2.5-pro
//!           api_key: ENV_OPENROUTER_API_KEY
//!           base_url: ENV_OPENROUTER_BASE_URL
//!           timeout: 500
//!       strategy: { slice: true, size: 500 }
//! transcriber:
//!   type: whisper
//!   config: { model_size: large, language: ja }
//!   quality_checker:
//!     providers: [...]
//!     interval: 30
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use aurora_domain::error::AuroraError;
use aurora_domain::services::{Provider, TaskType, WebScraper};

use crate::infrastructure::scrapers::missav::MissavScraper;
use crate::infrastructure::translation::orchestrator::{
    StrategySettings, TaskSettings, TranslateOrchestrator,
};
use crate::infrastructure::translation::prompts::PromptLibrary;
use crate::infrastructure::translation::provider::OpenAiProvider;

/// Root of the configuration tree.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SQLite connection URL for the manifest.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Stage by-products land under `<output_dir>/<movie code>/`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Daily log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Code-extractor noise and prefix files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub scrapers: Vec<ScraperConfig>,
    pub translate_orchestrator: OrchestratorConfig,
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_database_url() -> String {
    "sqlite://manifest.db".into()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub service: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub streaming_models: Vec<String>,
    /// Optional on-disk prompt overrides.
    #[serde(default)]
    pub prompt_dir: Option<PathBuf>,
    /// Task name → providers and strategy knobs.
    #[serde(default)]
    pub config: HashMap<String, TaskSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSection {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub strategy: Option<StrategySection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    #[serde(default)]
    pub slice: Option<bool>,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub service: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriberConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: WhisperSection,
    pub quality_checker: QualityCheckerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhisperSection {
    #[serde(default = "default_model_size")]
    pub model_size: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for WhisperSection {
    fn default() -> Self {
        Self {
            model_size: default_model_size(),
            language: default_language(),
        }
    }
}

fn default_model_size() -> String {
    "large".into()
}

fn default_language() -> String {
    "ja".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityCheckerSection {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Maximum allowed gap between successive cues, seconds.
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_interval() -> f64 {
    30.0
}

fn default_max_retries() -> u32 {
    3
}

/// External tool binaries; overridable for non-PATH installs.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    #[serde(default = "default_demucs")]
    pub demucs: String,
    #[serde(default = "default_whisper")]
    pub whisper: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            demucs: default_demucs(),
            whisper: default_whisper(),
        }
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".into()
}

fn default_ffprobe() -> String {
    "ffprobe".into()
}

fn default_demucs() -> String {
    "demucs".into()
}

fn default_whisper() -> String {
    "whisper".into()
}

impl AppConfig {
    /// Loads and deserializes the YAML config file.
    pub fn load(path: &Path) -> Result<Self, AuroraError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            AuroraError::InvalidConfiguration(format!(
                "Cannot read config {}: {}",
                path.display(),
                err
            ))
        })?;
        serde_yaml::from_str(&content).map_err(|err| {
            AuroraError::InvalidConfiguration(format!(
                "Cannot parse config {}: {}",
                path.display(),
                err
            ))
        })
    }
}

/// Resolves an `ENV_`-prefixed value from the environment.
pub fn resolve_env(value: &str) -> Result<String, AuroraError> {
    match value.strip_prefix("ENV_") {
        Some(name) => std::env::var(name).map_err(|_| {
            AuroraError::InvalidConfiguration(format!("Environment variable {} is not set", name))
        }),
        None => Ok(value.to_string()),
    }
}

/// Builds one provider from its config node.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>, AuroraError> {
    match config.service.as_str() {
        "openai" => {
            let api_key = resolve_env(&config.api_key)?;
            let base_url = resolve_env(&config.base_url)?;
            if api_key.is_empty() || base_url.is_empty() || config.model.is_empty() {
                return Err(AuroraError::InvalidConfiguration(format!(
                    "Provider for model '{}' is missing api_key, base_url, or model",
                    config.model
                )));
            }
            Ok(Arc::new(OpenAiProvider::new(
                api_key,
                base_url,
                config.model.clone(),
                config.timeout.map(Duration::from_secs),
            )))
        }
        other => Err(AuroraError::InvalidConfiguration(format!(
            "Unknown provider service type: {}",
            other
        ))),
    }
}

/// Builds the provider list for a task, skipping broken entries.
fn build_providers(configs: &[ProviderConfig]) -> Vec<Arc<dyn Provider>> {
    let mut providers = Vec::new();
    for config in configs {
        match build_provider(config) {
            Ok(provider) => providers.push(provider),
            Err(err) => warn!("Skipping provider '{}': {}", config.model, err),
        }
    }
    providers
}

fn task_from_key(key: &str) -> Option<TaskType> {
    match key {
        "director" => Some(TaskType::MetadataDirector),
        "actor" => Some(TaskType::MetadataActor),
        "category" => Some(TaskType::MetadataCategory),
        "studio" => Some(TaskType::MetadataStudio),
        "title" => Some(TaskType::MetadataTitle),
        "synopsis" => Some(TaskType::MetadataSynopsis),
        "correct" => Some(TaskType::CorrectSubtitle),
        "subtitle" => Some(TaskType::TranslateSubtitle),
        _ => None,
    }
}

/// Builds the translation orchestrator from its config subtree.
pub fn build_orchestrator(config: &OrchestratorConfig) -> TranslateOrchestrator {
    let prompts = Arc::new(PromptLibrary::new(config.prompt_dir.clone()));

    let mut tasks = HashMap::new();
    for (key, section) in &config.config {
        let Some(task) = task_from_key(key) else {
            warn!("Unknown translation task '{}' in config; ignoring", key);
            continue;
        };
        let strategy = section
            .strategy
            .as_ref()
            .map(|s| StrategySettings {
                slice: s.slice,
                size: s.size,
            })
            .unwrap_or_default();
        tasks.insert(
            task,
            TaskSettings {
                providers: build_providers(&section.providers),
                stream: section.stream,
                temperature: section.temperature,
                strategy,
            },
        );
    }

    TranslateOrchestrator::new(tasks, config.streaming_models.clone(), prompts)
}

/// Builds the scraper fleet in configured order.
pub fn build_scrapers(configs: &[ScraperConfig]) -> Vec<Arc<dyn WebScraper>> {
    let mut scrapers: Vec<Arc<dyn WebScraper>> = Vec::new();
    for config in configs {
        match config.service.as_str() {
            "missav" => scrapers.push(Arc::new(MissavScraper::new(config.base_url.clone()))),
            other => warn!("Unknown scraper service type '{}'; ignoring", other),
        }
    }
    scrapers
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
output_dir: ./out
scrapers:
  - service: missav
    base_url: https://missav.live
translate_orchestrator:
  streaming_models:
    - google/gemini-2.5-pro
  config:
    actor:
      providers:
        - service: openai
          model: deepseek/deepseek-chat
          api_key: test-key
          base_url: https://example.test/v1
      temperature: 0.2
    correct:
      providers: []
      strategy:
        slice: true
        size: 450
transcriber:
  type: whisper
  config:
    model_size: large
    language: ja
  quality_checker:
    providers: []
    interval: 25
"#;

    #[test]
    fn test_parse_sample_config() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./out"));
        assert_eq!(config.scrapers.len(), 1);
        assert_eq!(config.transcriber.kind, "whisper");
        assert_eq!(config.transcriber.quality_checker.interval, 25.0);
        assert_eq!(config.transcriber.quality_checker.max_retries, 3);
        assert_eq!(config.tools.ffmpeg, "ffmpeg");

        let correct = &config.translate_orchestrator.config["correct"];
        assert_eq!(correct.strategy.as_ref().unwrap().size, Some(450));
    }

    #[test]
    fn test_resolve_env() {
        std::env::set_var("AURORA_TEST_KEY", "secret");
        assert_eq!(resolve_env("ENV_AURORA_TEST_KEY").unwrap(), "secret");
        assert_eq!(resolve_env("plain-value").unwrap(), "plain-value");
        assert!(resolve_env("ENV_AURORA_TEST_MISSING_VAR").is_err());
    }

    #[test]
    fn test_build_provider_unknown_service() {
        let config = ProviderConfig {
            service: "anthropic-native".into(),
            model: "m".into(),
            api_key: "k".into(),
            base_url: "https://example.test".into(),
            timeout: None,
        };
        assert!(build_provider(&config).is_err());
    }

    #[test]
    fn test_build_provider_missing_env_fails() {
        let config = ProviderConfig {
            service: "openai".into(),
            model: "m".into(),
            api_key: "ENV_AURORA_DEFINITELY_UNSET".into(),
            base_url: "https://example.test".into(),
            timeout: None,
        };
        assert!(build_provider(&config).is_err());
    }

    #[test]
    fn test_build_scrapers_skips_unknown() {
        let scrapers = build_scrapers(&[
            ScraperConfig {
                service: "missav".into(),
                base_url: "https://missav.live".into(),
            },
            ScraperConfig {
                service: "javbus".into(),
                base_url: "https://example.test".into(),
            },
        ]);
        assert_eq!(scrapers.len(), 1);
    }
}
