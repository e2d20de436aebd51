// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AV Code Extractor
//!
//! Turns a video filename into a canonical `(label, number)` identity, or
//! nothing. Release filenames bury the code under tracker prefixes, quality
//! tags and zero-padding (`4k2.com@vrkm01477_1_4k.mp4` carries `VRKM-1477`),
//! so extraction runs in phases:
//!
//! 1. **Noise wash** — tokens from the user-maintained noise file are
//!    removed case-insensitively, each hit replaced by a space so adjacent
//!    fragments cannot fuse into a fake code.
//! 2. **Greedy candidate extraction** — two regex families over the washed
//!    name: the main `letters[-_]?digits` family, and the zero-padded
//!    family that drops a `0+` run between letters and digits
//!    (`VRKM01477` → `VRKM-1477`). Candidates are normalized to
//!    `LETTERS-digits`, deduplicated, and sorted longest first so fuller
//!    codes are preferred over embedded fragments.
//! 3. **Prefix prioritization** — when any candidate's letter prefix is in
//!    the persisted known-prefixes file, only those candidates survive.
//! 4. **Online validation** — only when two or more candidates remain:
//!    each candidate is checked against each scraper's `validate_code`,
//!    first hit wins.
//!
//! A lone survivor after washing or prioritization is accepted without
//! touching the network. Every accepted code appends its prefix to the
//! known-prefixes file, so the next file from the same studio short-
//! circuits. Both files are read at the start of each extraction; the
//! single-writer assumption makes the plain rewrite safe.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use aurora_domain::error::AuroraError;
use aurora_domain::services::WebScraper;
use aurora_domain::value_objects::AvCode;

static MAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Za-z]{2,8})\s*[-_]?\s*([0-9]{2,7})").expect("main pattern compiles")
});

static ZERO_PAD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Za-z]{2,8})(0+)([0-9]{2,7})").expect("zero-pad pattern compiles")
});

/// Filename → canonical AV code service.
pub struct CodeExtractor {
    scrapers: Vec<Arc<dyn WebScraper>>,
    prefix_path: PathBuf,
    noise_path: PathBuf,
}

impl CodeExtractor {
    /// Creates the extractor, touching both persistence files into
    /// existence.
    pub fn new(
        scrapers: Vec<Arc<dyn WebScraper>>,
        prefix_path: PathBuf,
        noise_path: PathBuf,
    ) -> Result<Self, AuroraError> {
        for path in [&prefix_path, &noise_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if !path.exists() {
                std::fs::write(path, "")?;
            }
        }
        Ok(Self {
            scrapers,
            prefix_path,
            noise_path,
        })
    }

    /// Reads one-token-per-line files into an uppercase set.
    fn parse_list_file(path: &PathBuf) -> HashSet<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(|l| l.trim().to_ascii_uppercase())
                .filter(|l| !l.is_empty())
                .collect(),
            Err(_) => HashSet::new(),
        }
    }

    /// Removes every noise token, replacing hits with a space.
    fn wash_noises(file_name: &str, noises: &HashSet<String>) -> String {
        if noises.is_empty() {
            return file_name.to_string();
        }
        let pattern = noises
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        match Regex::new(&format!("(?i){}", pattern)) {
            Ok(re) => re.replace_all(file_name, " ").into_owned(),
            Err(_) => file_name.to_string(),
        }
    }

    /// Greedy extraction over both pattern families, normalized and
    /// deduplicated, longest candidates first.
    fn greedy_extract(file_name: &str) -> Vec<String> {
        let mut candidates: HashSet<String> = HashSet::new();

        for caps in MAIN_PATTERN.captures_iter(file_name) {
            candidates.insert(format!("{}-{}", caps[1].to_ascii_uppercase(), &caps[2]));
        }
        for caps in ZERO_PAD_PATTERN.captures_iter(file_name) {
            candidates.insert(format!("{}-{}", caps[1].to_ascii_uppercase(), &caps[3]));
        }

        let mut sorted: Vec<String> = candidates.into_iter().collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        sorted
    }

    /// Keeps only known-prefix candidates when any exist.
    fn filter_by_prefix(candidates: Vec<String>, prefixes: &HashSet<String>) -> Vec<String> {
        if prefixes.is_empty() {
            return candidates;
        }
        let (known, unknown): (Vec<String>, Vec<String>) = candidates
            .into_iter()
            .partition(|code| prefixes.contains(code.split('-').next().unwrap_or_default()));
        if known.is_empty() {
            unknown
        } else {
            known
        }
    }

    /// Appends the accepted code's prefix to the known-prefixes file.
    fn record_prefix(&self, code: &str, prefixes: &HashSet<String>) {
        let prefix = code.split('-').next().unwrap_or_default().to_string();
        if prefix.is_empty() || prefixes.contains(&prefix) {
            return;
        }
        let mut all: Vec<String> = prefixes.iter().cloned().collect();
        all.push(prefix);
        all.sort();
        if let Err(err) = std::fs::write(&self.prefix_path, all.join("\n")) {
            warn!("Failed to update prefix file: {}", err);
        }
    }

    fn accept(&self, code: &str, prefixes: &HashSet<String>, file_name: &str) -> Option<AvCode> {
        self.record_prefix(code, prefixes);
        let (label, number) = code.split_once('-')?;
        match AvCode::standard(label, number) {
            Ok(code) => {
                info!("Extracted code '{}' from file '{}'", code, file_name);
                Some(code)
            }
            Err(err) => {
                warn!("Candidate '{}' failed validation: {}", code, err);
                None
            }
        }
    }

    /// Full extraction and validation flow for one filename.
    pub async fn extract_av_code(&self, file_name: &str) -> Option<AvCode> {
        let noises = Self::parse_list_file(&self.noise_path);
        let cleaned = Self::wash_noises(file_name, &noises);
        debug!("Washed '{}' -> '{}'", file_name, cleaned);

        let prefixes = Self::parse_list_file(&self.prefix_path);
        let candidates = Self::greedy_extract(&cleaned);
        if candidates.is_empty() {
            warn!("No code candidates found in '{}'", cleaned);
            return None;
        }
        debug!("Candidates: {:?}", candidates);

        if candidates.len() == 1 {
            return self.accept(&candidates[0], &prefixes, file_name);
        }

        let prioritized = Self::filter_by_prefix(candidates, &prefixes);
        debug!("Prioritized candidates: {:?}", prioritized);
        if prioritized.len() == 1 {
            return self.accept(&prioritized[0], &prefixes, file_name);
        }

        // Two or more plausible codes left; let the sites arbitrate.
        for candidate in &prioritized {
            let Some((label, number)) = candidate.split_once('-') else {
                continue;
            };
            let Ok(code) = AvCode::standard(label, number) else {
                continue;
            };
            for scraper in &self.scrapers {
                if !scraper.available() {
                    continue;
                }
                debug!("Validating '{}' against {}", candidate, scraper.base_url());
                if scraper.validate_code(&code).await {
                    return self.accept(candidate, &prefixes, file_name);
                }
            }
        }

        warn!("All candidates failed online validation for '{}'", file_name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aurora_domain::entities::Metadata;
    use tempfile::TempDir;

    struct FixedScraper {
        valid: String,
        calls: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebScraper for FixedScraper {
        fn base_url(&self) -> &str {
            "https://example.test"
        }

        fn available(&self) -> bool {
            true
        }

        async fn request(&self, _code: &AvCode, _lang: &str) -> Result<String, AuroraError> {
            Ok(String::new())
        }

        async fn validate_code(&self, code: &AvCode) -> bool {
            self.calls.lock().unwrap().push(code.to_string());
            code.to_string() == self.valid
        }

        async fn fetch_metadata(&self, _code: &AvCode) -> Result<Metadata, AuroraError> {
            Ok(Metadata::default())
        }
    }

    fn extractor_in(dir: &TempDir, scrapers: Vec<Arc<dyn WebScraper>>) -> CodeExtractor {
        CodeExtractor::new(
            scrapers,
            dir.path().join("prefix.txt"),
            dir.path().join("noise.txt"),
        )
        .unwrap()
    }

    #[test]
    fn test_greedy_extract_main_pattern() {
        let candidates = CodeExtractor::greedy_extract("PRED-782-FHD");
        assert!(candidates.contains(&"PRED-782".to_string()));
    }

    #[test]
    fn test_greedy_extract_zero_pad() {
        let candidates = CodeExtractor::greedy_extract("vrkm01477_1_4k");
        assert!(candidates.contains(&"VRKM-1477".to_string()));
        // The main family also sees the padded spelling.
        assert!(candidates.contains(&"VRKM-01477".to_string()));
        // Longest-first ordering.
        assert_eq!(candidates[0], "VRKM-01477");
    }

    #[test]
    fn test_wash_noises_replaces_with_space() {
        let noises: HashSet<String> = ["HHD800.COM@".to_string()].into();
        let washed = CodeExtractor::wash_noises("hhd800.com@RKI-715", &noises);
        assert_eq!(washed.trim(), "RKI-715");
    }

    #[test]
    fn test_filter_by_prefix_keeps_known_only() {
        let prefixes: HashSet<String> = ["VRKM".to_string()].into();
        let filtered = CodeExtractor::filter_by_prefix(
            vec!["ABCD-123".into(), "VRKM-1477".into()],
            &prefixes,
        );
        assert_eq!(filtered, vec!["VRKM-1477".to_string()]);
    }

    #[tokio::test]
    async fn test_single_candidate_needs_no_network() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor_in(&dir, vec![]);

        // No scrapers are configured, so any validation attempt would fail;
        // a lone candidate must not need one.
        let code = extractor.extract_av_code("DNJR139.mp4").await.unwrap();
        assert_eq!(code.to_string(), "DNJR-139");

        // Prefix gets recorded for the next run.
        let recorded = std::fs::read_to_string(dir.path().join("prefix.txt")).unwrap();
        assert!(recorded.contains("DNJR"));
    }

    #[tokio::test]
    async fn test_noise_wash_unmasks_code() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("noise.txt"), "hhd800.com@\n").unwrap();
        let extractor = extractor_in(&dir, vec![]);

        let code = extractor.extract_av_code("hhd800.com@RKI-715.mp4").await.unwrap();
        assert_eq!(code.to_string(), "RKI-715");
    }

    #[tokio::test]
    async fn test_ambiguous_candidates_resolved_online() {
        let dir = TempDir::new().unwrap();
        let scraper = Arc::new(FixedScraper {
            valid: "VRKM-1477".into(),
            calls: std::sync::Mutex::new(Vec::new()),
        });
        let extractor = extractor_in(&dir, vec![scraper.clone() as Arc<dyn WebScraper>]);

        let code = extractor.extract_av_code("vrkm01477_1_4k.mp4").await.unwrap();
        assert_eq!(code.to_string(), "VRKM-1477");
        // The padded variant was tried and rejected first.
        assert!(scraper.calls.lock().unwrap().contains(&"VRKM-01477".to_string()));
    }

    #[tokio::test]
    async fn test_known_prefix_narrows_to_one_without_network() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("prefix.txt"), "VRKM\n").unwrap();
        // No scrapers: acceptance must happen offline.
        let extractor = extractor_in(&dir, vec![]);

        let code = extractor
            .extract_av_code("ABCD-123 VRKM-1477.mp4")
            .await
            .unwrap();
        assert_eq!(code.to_string(), "VRKM-1477");
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor_in(&dir, vec![]);
        assert!(extractor.extract_av_code("holiday footage.mp4").await.is_none());
    }
}
