// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Web Scraper Port
//!
//! One [`WebScraper`] per metadata site. Sites come and go and change
//! markup, so everything above this trait treats them as interchangeable:
//! the code extractor tries `validate_code` across all of them, and the
//! scrape stage takes the first `fetch_metadata` that succeeds.
//!
//! Implementations must enforce a per-instance minimum inter-request
//! interval of two seconds, advancing the throttle clock even on failed
//! requests, and must flip `available` to false on hard connection
//! failures so the rest of the run skips the site.

use async_trait::async_trait;

use crate::entities::Metadata;
use crate::error::AuroraError;
use crate::value_objects::AvCode;

/// Per-site scraping adapter.
#[async_trait]
pub trait WebScraper: Send + Sync {
    /// Base URL, for logs.
    fn base_url(&self) -> &str;

    /// False after a hard connection failure; checked before every use.
    fn available(&self) -> bool;

    /// Fetches the raw page for a code in a site language (`"ja"`, `"cn"`).
    ///
    /// Enforces the ≥2 s inter-request throttle.
    ///
    /// # Errors
    ///
    /// `ScrapeError` on HTTP failure. 403/404 responses fail the request
    /// without marking the site unavailable.
    async fn request(&self, code: &AvCode, lang: &str) -> Result<String, AuroraError>;

    /// Whether the site knows this code (used for candidate validation).
    async fn validate_code(&self, code: &AvCode) -> bool;

    /// Two-pass metadata fetch: source-language page for originals, then
    /// the Chinese page to augment translations by matching original text.
    ///
    /// # Errors
    ///
    /// Fails when the source-language pass fails; a failed Chinese pass
    /// just leaves translations absent.
    async fn fetch_metadata(&self, code: &AvCode) -> Result<Metadata, AuroraError>;
}
