// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # MissAV Site Adapter
//!
//! Scrapes `missav`-style pages, which expose the same movie under
//! per-language paths (`/dm31/ja/{code}`, `/dm31/cn/{code}`). Metadata is
//! assembled in two passes:
//!
//! 1. the Japanese page populates every original field — title, synopsis,
//!    release date, director, performers, categories, studio;
//! 2. the Chinese page augments translations by matching original text.
//!    Performer links on that page render as `译名 (原名)`; the original in
//!    parentheses is the join key back to pass 1.
//!
//! Fields present in only one language stay original-only. A failed first
//! pass fails the fetch; a failed second pass just leaves translations
//! absent for the orchestrator to fill.
//!
//! Field extraction works on the raw HTML with regexes over the labelled
//! info rows — the pages are server-rendered and stable enough that a DOM
//! parser would buy nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info, warn};

use aurora_domain::entities::{
    Actor, BilingualList, BilingualText, CategorySet, Metadata,
};
use aurora_domain::error::AuroraError;
use aurora_domain::services::WebScraper;
use aurora_domain::value_objects::AvCode;

/// Minimum spacing between requests to one site instance.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(2);

static H1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<h1[^>]*>([^<]+)</h1>").expect("h1 regex compiles"));
static SYNOPSIS_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="mb-1"[^>]*>(.*?)</div>"#).expect("synopsis regex compiles")
});
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a[^>]*>([^<]+)</a>").expect("anchor regex compiles"));
static TIME_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<time[^>]*>([^<]+)</time>").expect("time regex compiles"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex compiles"));
static TRANSLATED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\((.+?)\)$").expect("name pair regex compiles"));

/// Scraper for missav-style sites.
pub struct MissavScraper {
    base_url: String,
    client: reqwest::Client,
    available: AtomicBool,
    last_request_time: Mutex<Option<Instant>>,
}

impl MissavScraper {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            )
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builds");
        Self {
            base_url: base_url.into(),
            client,
            available: AtomicBool::new(true),
            last_request_time: Mutex::new(None),
        }
    }

    /// Sleeps out the remainder of the inter-request interval.
    async fn throttle(&self) {
        let wait = {
            let guard = self.last_request_time.lock();
            guard.and_then(|last| MIN_REQUEST_INTERVAL.checked_sub(last.elapsed()))
        };
        if let Some(wait) = wait {
            debug!("Throttling request for {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    fn touch_clock(&self) {
        *self.last_request_time.lock() = Some(Instant::now());
    }

    /// The labelled info rows (`<div class="text-secondary">…</div>`).
    fn info_sections(html: &str) -> Vec<&str> {
        html.split("<div class=\"text-secondary")
            .skip(1)
            .map(|chunk| chunk.split("</div>").next().unwrap_or(chunk))
            .collect()
    }

    fn anchor_texts(section: &str) -> Vec<String> {
        ANCHOR
            .captures_iter(section)
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn strip_tags(fragment: &str) -> String {
        TAG.replace_all(fragment, "").trim().to_string()
    }

    /// Fills original-language fields from the Japanese page.
    fn parse_original(html: &str, metadata: &mut Metadata) {
        if let Some(caps) = H1.captures(html) {
            metadata.title = Some(BilingualText::new(caps[1].trim()));
        }
        if let Some(caps) = SYNOPSIS_DIV.captures(html) {
            let synopsis = Self::strip_tags(&caps[1]);
            if !synopsis.is_empty() {
                metadata.synopsis = Some(BilingualText::new(synopsis));
            }
        }

        let mut categories: Vec<String> = Vec::new();
        for section in Self::info_sections(html) {
            if section.contains("配信開始日:") || section.contains("発売日:") {
                if let Some(caps) = TIME_TAG.captures(section) {
                    metadata.release_date = Some(caps[1].trim().to_string());
                }
            } else if section.contains("監督:") {
                if let Some(name) = Self::anchor_texts(section).into_iter().next() {
                    metadata.director = Some(BilingualText::new(name));
                }
            } else if section.contains("女優:") {
                for name in Self::anchor_texts(section) {
                    metadata.actresses.push(Actor::from_name(BilingualText::new(name)));
                }
            } else if section.contains("男優:") {
                for name in Self::anchor_texts(section) {
                    metadata.actors.push(Actor::from_name(BilingualText::new(name)));
                }
            } else if section.contains("ジャンル:") {
                categories = Self::anchor_texts(section);
            } else if section.contains("メーカー:") {
                if let Some(name) = Self::anchor_texts(section).into_iter().next() {
                    metadata.studio = Some(BilingualText::new(name));
                }
            }
        }
        if !categories.is_empty() {
            metadata.categories = Some(CategorySet::ListWise(BilingualList::new(categories)));
        }
    }

    /// The Chinese page shortens some studio brands to their house
    /// abbreviation; expand the known ones back to the full name.
    fn expand_studio_abbreviation(name: String) -> String {
        match name.as_str() {
            "S1" => "S1 NO.1 STYLE".to_string(),
            _ => name,
        }
    }

    /// `译名 (原名)` anchors → original-keyed translation map.
    fn translated_names(section: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for text in Self::anchor_texts(section) {
            if let Some(caps) = TRANSLATED_NAME.captures(&text) {
                map.insert(caps[2].trim().to_string(), caps[1].trim().to_string());
            } else {
                // A bare name translates as itself (kanji shared across
                // both languages).
                map.insert(text.clone(), text);
            }
        }
        map
    }

    fn supplement_actors(actors: &mut [Actor], translations: &HashMap<String, String>) {
        for actor in actors {
            for name in &mut actor.names {
                if name.translated.is_none() {
                    if let Some(t) = translations.get(&name.original) {
                        name.translated = Some(t.clone());
                    }
                }
            }
        }
    }

    /// Augments `translated` fields from the Chinese page.
    fn parse_translations(html: &str, metadata: &mut Metadata) {
        for section in Self::info_sections(html) {
            if section.contains("女优:") {
                let map = Self::translated_names(section);
                Self::supplement_actors(&mut metadata.actresses, &map);
            } else if section.contains("男优:") {
                let map = Self::translated_names(section);
                Self::supplement_actors(&mut metadata.actors, &map);
            } else if section.contains("导演:") {
                if let Some(director) = &mut metadata.director {
                    let map = Self::translated_names(section);
                    if let Some(t) = map.get(&director.original) {
                        director.translated = Some(t.clone());
                    }
                }
            } else if section.contains("类型:") {
                let translated = Self::anchor_texts(section);
                if let Some(CategorySet::ListWise(list)) = &mut metadata.categories {
                    if !translated.is_empty() {
                        list.translated = Some(translated);
                    }
                }
            } else if section.contains("发行商:") {
                if let Some(studio) = &mut metadata.studio {
                    if let Some(name) = Self::anchor_texts(section).into_iter().next() {
                        studio.translated = Some(Self::expand_studio_abbreviation(name));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl WebScraper for MissavScraper {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request(&self, code: &AvCode, lang: &str) -> Result<String, AuroraError> {
        if !self.available() {
            return Err(AuroraError::ScrapeError(format!(
                "Site {} is unavailable after an earlier failure",
                self.base_url
            )));
        }

        self.throttle().await;

        let url = format!(
            "{}/dm31/{}/{}",
            self.base_url,
            lang,
            code.to_string().to_ascii_lowercase()
        );
        debug!("Requesting {}", url);

        let outcome = self.client.get(&url).send().await;
        self.touch_clock();

        let response = outcome.map_err(|err| {
            // Connection-level failure: the site is gone for this run.
            self.available.store(false, Ordering::SeqCst);
            warn!("Site {} marked unavailable: {}", self.base_url, err);
            AuroraError::ScrapeError(format!("Request to {} failed: {}", url, err))
        })?;

        let status = response.status();
        if !status.is_success() {
            // 403/404 are page-level outcomes, not site outages.
            if status.as_u16() != 403 && status.as_u16() != 404 {
                self.available.store(false, Ordering::SeqCst);
                warn!("Site {} marked unavailable: HTTP {}", self.base_url, status);
            }
            return Err(AuroraError::ScrapeError(format!(
                "Request to {} failed with HTTP {}",
                url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|err| AuroraError::ScrapeError(format!("Reading {} failed: {}", url, err)))
    }

    async fn validate_code(&self, code: &AvCode) -> bool {
        match self.request(code, "cn").await {
            Ok(html) => {
                let is_404_page = html.contains("404") && html.contains("找不到页面");
                !is_404_page
            }
            Err(_) => false,
        }
    }

    async fn fetch_metadata(&self, code: &AvCode) -> Result<Metadata, AuroraError> {
        let mut metadata = Metadata::default();

        info!("Fetching original metadata for {}", code);
        let html_ja = self.request(code, "ja").await?;
        Self::parse_original(&html_ja, &mut metadata);

        info!("Supplementing translations for {}", code);
        match self.request(code, "cn").await {
            Ok(html_cn) => Self::parse_translations(&html_cn, &mut metadata),
            Err(err) => {
                warn!(
                    "Chinese page unavailable for {}; translations stay empty: {}",
                    code, err
                );
            }
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JA_PAGE: &str = r##"
        <h1>僕の先輩 デジタルリマスター版</h1>
        <div class="mb-1">とある会社のあらすじ。</div>
        <div class="text-secondary"><span>配信開始日:</span> <time>2024-03-01</time></div>
        <div class="text-secondary"><span>監督:</span> <a href="#">きとるね川口</a></div>
        <div class="text-secondary"><span>女優:</span> <a href="#">星宮一花</a> <a href="#">管野静香</a></div>
        <div class="text-secondary"><span>男優:</span> <a href="#">男優A</a></div>
        <div class="text-secondary"><span>ジャンル:</span> <a href="#">単体作品</a> <a href="#">ドラマ</a></div>
        <div class="text-secondary"><span>メーカー:</span> <a href="#">S1</a></div>
    "##;

    const CN_PAGE: &str = r##"
        <div class="text-secondary"><span>导演:</span> <a href="#">基托鲁内川口 (きとるね川口)</a></div>
        <div class="text-secondary"><span>女优:</span> <a href="#">星宫一花 (星宮一花)</a></div>
        <div class="text-secondary"><span>类型:</span> <a href="#">单体作品</a> <a href="#">剧情</a></div>
        <div class="text-secondary"><span>发行商:</span> <a href="#">S1</a></div>
    "##;

    #[test]
    fn test_parse_original_fields() {
        let mut metadata = Metadata::default();
        MissavScraper::parse_original(JA_PAGE, &mut metadata);

        assert_eq!(
            metadata.title.as_ref().unwrap().original,
            "僕の先輩 デジタルリマスター版"
        );
        assert_eq!(metadata.synopsis.as_ref().unwrap().original, "とある会社のあらすじ。");
        assert_eq!(metadata.release_date.as_deref(), Some("2024-03-01"));
        assert_eq!(metadata.director.as_ref().unwrap().original, "きとるね川口");
        assert_eq!(metadata.actresses.len(), 2);
        assert_eq!(metadata.actors.len(), 1);
        assert_eq!(metadata.studio.as_ref().unwrap().original, "S1");
        match metadata.categories.as_ref().unwrap() {
            CategorySet::ListWise(list) => {
                assert_eq!(list.original, vec!["単体作品", "ドラマ"]);
                assert!(list.translated.is_none());
            }
            other => panic!("unexpected category shape: {:?}", other),
        }
    }

    #[test]
    fn test_two_pass_merge() {
        let mut metadata = Metadata::default();
        MissavScraper::parse_original(JA_PAGE, &mut metadata);
        MissavScraper::parse_translations(CN_PAGE, &mut metadata);

        // Director matched on the original in parentheses.
        assert_eq!(
            metadata.director.as_ref().unwrap().translated.as_deref(),
            Some("基托鲁内川口")
        );
        // First actress matched; the second only exists in Japanese.
        assert_eq!(
            metadata.actresses[0].names[0].translated.as_deref(),
            Some("星宫一花")
        );
        assert!(metadata.actresses[1].names[0].translated.is_none());
        // Categories arrive as a list-level pair.
        match metadata.categories.as_ref().unwrap() {
            CategorySet::ListWise(list) => {
                assert_eq!(list.translated.as_ref().unwrap(), &vec!["单体作品", "剧情"]);
            }
            other => panic!("unexpected category shape: {:?}", other),
        }
        // The Chinese page abbreviates the studio; the known brand expands.
        assert_eq!(
            metadata.studio.as_ref().unwrap().translated.as_deref(),
            Some("S1 NO.1 STYLE")
        );
    }

    #[test]
    fn test_unknown_studio_name_passes_through() {
        assert_eq!(
            MissavScraper::expand_studio_abbreviation("プレステージ".into()),
            "プレステージ"
        );
        assert_eq!(
            MissavScraper::expand_studio_abbreviation("S1".into()),
            "S1 NO.1 STYLE"
        );
    }

    #[test]
    fn test_translated_names_bare_name_maps_to_itself() {
        let map = MissavScraper::translated_names(r##"<a href="#">管野静香</a>"##);
        assert_eq!(map.get("管野静香").map(String::as_str), Some("管野静香"));
    }
}
