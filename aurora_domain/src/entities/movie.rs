// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Movie Entity
//!
//! A [`Movie`] aggregates everything known about one title: its canonical
//! [`AvCode`] identity, the scraped [`Metadata`] graph, the videos that map
//! to it, and the glossary [`Term`]s accumulated during subtitle correction.
//!
//! Movies are created by the scanner the first time a file maps to a code,
//! and mutated only by the scrape stage (metadata) and the correction stage
//! (terms). The identity tuple never changes; anonymous movies keep the
//! fingerprint of their first discovered video as their number even when
//! more videos are attached later.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::metadata::Metadata;
use crate::entities::term::Term;
use crate::entities::video::Video;
use crate::error::AuroraError;
use crate::value_objects::{AvCode, Fingerprint};

/// One movie: identity, metadata, videos, and glossary terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub code: AvCode,
    pub metadata: Option<Metadata>,
    pub videos: Vec<Video>,
    pub terms: Vec<Term>,
}

impl Movie {
    /// Creates a standard movie from an extracted `(label, number)` pair.
    pub fn standard(label: &str, number: &str) -> Result<Self, AuroraError> {
        Ok(Self::with_code(AvCode::standard(label, number)?))
    }

    /// Creates an anonymous movie keyed by a video fingerprint.
    pub fn anonymous(fingerprint: &Fingerprint) -> Result<Self, AuroraError> {
        Ok(Self::with_code(AvCode::anonymous(fingerprint.as_str())?))
    }

    /// Wraps an already-validated code.
    pub fn with_code(code: AvCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            metadata: None,
            videos: Vec::new(),
            terms: Vec::new(),
        }
    }

    /// `LABEL-number` rendering of the identity.
    pub fn code_string(&self) -> String {
        self.code.to_string()
    }

    pub fn is_anonymous(&self) -> bool {
        self.code.is_anonymous()
    }

    /// Merges newly discovered terms, deduplicating on `origin`.
    ///
    /// Returns how many terms were actually added. Existing entries win so
    /// earlier slices keep their established translations.
    pub fn merge_terms(&mut self, fresh: Vec<Term>) -> usize {
        let mut seen: std::collections::HashSet<String> =
            self.terms.iter().map(|t| t.origin.clone()).collect();
        let mut added = 0;
        for term in fresh {
            if seen.insert(term.origin.clone()) {
                self.terms.push(term);
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_movie() {
        let movie = Movie::standard("abc", "123").unwrap();
        assert_eq!(movie.code_string(), "ABC-123");
        assert!(!movie.is_anonymous());
    }

    #[test]
    fn test_anonymous_movie() {
        let fp = Fingerprint::new(&"cd".repeat(32)).unwrap();
        let movie = Movie::anonymous(&fp).unwrap();
        assert!(movie.is_anonymous());
        assert_eq!(movie.code.number(), fp.as_str());
    }

    #[test]
    fn test_merge_terms_dedups_on_origin() {
        let mut movie = Movie::standard("ABC", "123").unwrap();
        let added = movie.merge_terms(vec![
            Term::new("ウエムラ", "上村"),
            Term::new("ナフレス", "那弗勒斯"),
        ]);
        assert_eq!(added, 2);

        // Same origin with a different translation must not replace.
        let added = movie.merge_terms(vec![Term::new("ウエムラ", "植村")]);
        assert_eq!(added, 0);
        assert_eq!(movie.terms.len(), 2);
        assert_eq!(movie.terms[0].recommended_translation, "上村");
    }
}
