// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Glossary Terms
//!
//! A [`Term`] is one proper noun the correction LLM identified in a movie's
//! subtitles, together with its recommended translation. Terms accumulate
//! per movie during correction and are fed back into later subtitle slices
//! as context, which keeps names consistent across the whole file.
//!
//! [`Glossary`] entries are the cross-movie catalog; [`GlossaryHit`] links a
//! glossary entry to every movie it appeared in.
//!
//! The serde field names match the provider JSON contract directly
//! (`japanese` / `recommended_chinese` / `description`), so terms parsed
//! from an LLM response and terms built in code share one shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One per-movie proper-noun translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(rename = "japanese")]
    pub origin: String,
    #[serde(rename = "recommended_chinese")]
    pub recommended_translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Term {
    pub fn new(origin: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            recommended_translation: translation.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One cross-movie glossary entry.
///
/// Glossary rows are promoted from per-movie terms: the first movie whose
/// correction discovers a proper noun contributes its translation, later
/// movies only add hit records. The entry therefore keeps its first
/// established translation, matching the per-movie dedup rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    pub id: Uuid,
    pub jap_text: String,
    pub sch_text: Option<String>,
    pub description: Option<String>,
}

impl Glossary {
    pub fn new(jap_text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            jap_text: jap_text.into(),
            sch_text: None,
            description: None,
        }
    }

    /// Lifts a per-movie term into catalog shape.
    pub fn from_term(term: &Term) -> Self {
        Self {
            id: Uuid::new_v4(),
            jap_text: term.origin.clone(),
            sch_text: Some(term.recommended_translation.clone()),
            description: term.description.clone(),
        }
    }
}

/// A glossary entry observed in a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryHit {
    pub id: Uuid,
    pub glossary_id: Uuid,
    pub movie_id: Uuid,
}

impl GlossaryHit {
    /// Links a glossary entry to a movie it appeared in.
    pub fn link(glossary_id: Uuid, movie_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            glossary_id,
            movie_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_serializes_to_wire_contract() {
        let term = Term::new("ポッピン パーティー", "Poppin'Party")
            .with_description("影片中主角自行组建的乐队名。");
        let json = serde_json::to_value(&term).unwrap();
        assert_eq!(json["japanese"], "ポッピン パーティー");
        assert_eq!(json["recommended_chinese"], "Poppin'Party");
        assert!(json["description"].is_string());
    }

    #[test]
    fn test_term_parses_without_description() {
        let term: Term =
            serde_json::from_str(r#"{"japanese": "ナフレス", "recommended_chinese": "那弗勒斯"}"#)
                .unwrap();
        assert_eq!(term.origin, "ナフレス");
        assert!(term.description.is_none());
    }

    #[test]
    fn test_glossary_from_term() {
        let term = Term::new("ウエムラ", "上村").with_description("反派角色名");
        let entry = Glossary::from_term(&term);
        assert_eq!(entry.jap_text, "ウエムラ");
        assert_eq!(entry.sch_text.as_deref(), Some("上村"));
        assert_eq!(entry.description.as_deref(), Some("反派角色名"));
    }

    #[test]
    fn test_glossary_hit_link() {
        let entry = Glossary::new("ナフレス");
        let movie_id = Uuid::new_v4();
        let hit = GlossaryHit::link(entry.id, movie_id);
        assert_eq!(hit.glossary_id, entry.id);
        assert_eq!(hit.movie_id, movie_id);
    }
}
