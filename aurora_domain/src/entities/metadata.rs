// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bilingual Metadata Graph
//!
//! [`Metadata`] is the scraped, partially-translated description of a movie:
//! title, synopsis, release date, director, studio, categories, and the two
//! performer rosters. Every textual field is a [`BilingualText`] holding the
//! source-language original and an optional translation; the scrape stage
//! fills translations from the Chinese page where available and leaves the
//! rest for the translation orchestrator.
//!
//! Categories come in two shapes because scrapers differ: some sites pair
//! every original tag with its translation (item-wise), others expose two
//! lists whose lengths may disagree. [`CategorySet`] models both as a small
//! sum type instead of forcing a lossy alignment.
//!
//! An [`Actor`] groups one performer's aliases: `current_name` plus the
//! alias list the consolidation algorithm in the manifest matches against.

use serde::{Deserialize, Serialize};

/// A source-language text with an optional translation.
///
/// # Examples
///
/// ```
/// use aurora_domain::entities::BilingualText;
///
/// let t = BilingualText::new("三上悠亜");
/// assert_eq!(t.preferred(), "三上悠亜");
///
/// let t = t.with_translation("三上悠亚");
/// assert_eq!(t.preferred(), "三上悠亚");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub original: String,
    pub translated: Option<String>,
}

impl BilingualText {
    /// Creates an untranslated text.
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: None,
        }
    }

    /// Returns a copy carrying the given translation.
    pub fn with_translation(mut self, translated: impl Into<String>) -> Self {
        self.translated = Some(translated.into());
        self
    }

    /// The translation when present, the original otherwise.
    pub fn preferred(&self) -> &str {
        self.translated.as_deref().unwrap_or(&self.original)
    }

    /// JSON shape used in prompts: `{"japanese": ..., "chinese": ...?}`.
    pub fn to_prompt_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("japanese".into(), self.original.clone().into());
        if let Some(t) = &self.translated {
            map.insert("chinese".into(), t.clone().into());
        }
        serde_json::Value::Object(map)
    }
}

/// Two corresponding lists, original-language and translated.
///
/// The translated list may be shorter than (or missing relative to) the
/// original; items are positional, not keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualList {
    pub original: Vec<String>,
    pub translated: Option<Vec<String>>,
}

impl BilingualList {
    pub fn new(original: Vec<String>) -> Self {
        Self {
            original,
            translated: None,
        }
    }

    /// Whether a usable translation exists for every original item.
    pub fn fully_translated(&self) -> bool {
        self.translated
            .as_ref()
            .map(|t| t.len() == self.original.len())
            .unwrap_or(false)
    }
}

/// Movie categories, in whichever shape the scraper produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategorySet {
    /// Each original tag is paired with its own translation.
    ItemWise(Vec<BilingualText>),
    /// Two list-level languages; lengths may differ.
    ListWise(BilingualList),
}

impl CategorySet {
    /// Display strings, preferring translations.
    pub fn display_items(&self) -> Vec<String> {
        match self {
            CategorySet::ItemWise(items) => {
                items.iter().map(|t| t.preferred().to_string()).collect()
            }
            CategorySet::ListWise(list) => match &list.translated {
                Some(translated) if !translated.is_empty() => translated.clone(),
                _ => list.original.clone(),
            },
        }
    }

    /// All original-language tags, regardless of shape.
    pub fn original_items(&self) -> Vec<String> {
        match self {
            CategorySet::ItemWise(items) => items.iter().map(|t| t.original.clone()).collect(),
            CategorySet::ListWise(list) => list.original.clone(),
        }
    }
}

/// Performer gender, as recorded in the actor arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = crate::error::AuroraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(crate::error::AuroraError::ValidationError(format!(
                "Unknown gender: {}",
                s
            ))),
        }
    }
}

/// One performer with their alias set.
///
/// `current_name` is the display name; `names` holds every alias seen for
/// this performer. The manifest consolidates identity by scanning the alias
/// originals against the registered `actor_names` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub current_name: String,
    pub names: Vec<BilingualText>,
}

impl Actor {
    /// Creates an actor whose only known alias is the current name.
    pub fn from_name(name: BilingualText) -> Self {
        Self {
            current_name: name.original.clone(),
            names: vec![name],
        }
    }

    /// Prompt roster entries for every alias.
    pub fn roster_values(&self) -> Vec<serde_json::Value> {
        self.names.iter().map(|n| n.to_prompt_value()).collect()
    }
}

/// The full scraped metadata graph of one movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<BilingualText>,
    pub release_date: Option<String>,
    pub director: Option<BilingualText>,
    pub studio: Option<BilingualText>,
    pub synopsis: Option<BilingualText>,
    pub categories: Option<CategorySet>,
    pub actors: Vec<Actor>,
    pub actresses: Vec<Actor>,
}

impl Metadata {
    /// Whether any identifying field was scraped at all.
    ///
    /// A movie row may exist before scraping; an empty graph is treated as
    /// "no metadata yet" so the scrape stage runs.
    pub fn has_content(&self) -> bool {
        self.title.is_some() || self.director.is_some() || self.studio.is_some()
    }

    /// Prompt rosters: every alias of every actor / actress.
    pub fn actor_roster(&self) -> Vec<serde_json::Value> {
        self.actors.iter().flat_map(|a| a.roster_values()).collect()
    }

    pub fn actress_roster(&self) -> Vec<serde_json::Value> {
        self.actresses.iter().flat_map(|a| a.roster_values()).collect()
    }

    /// Serializes present fields into the prompt `movie_info.metadata` value.
    pub fn to_prompt_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(title) = &self.title {
            map.insert("title".into(), title.to_prompt_value());
        }
        if let Some(date) = &self.release_date {
            map.insert("release_date".into(), date.clone().into());
        }
        if let Some(director) = &self.director {
            map.insert("director".into(), director.to_prompt_value());
        }
        if let Some(studio) = &self.studio {
            map.insert("studio".into(), studio.to_prompt_value());
        }
        if let Some(synopsis) = &self.synopsis {
            map.insert("synopsis".into(), synopsis.to_prompt_value());
        }
        if let Some(categories) = &self.categories {
            let items = match categories {
                CategorySet::ItemWise(items) => {
                    items.iter().map(|t| t.to_prompt_value()).collect::<Vec<_>>()
                }
                CategorySet::ListWise(list) => {
                    let mut m = serde_json::Map::new();
                    m.insert("japanese".into(), list.original.clone().into());
                    if let Some(t) = &list.translated {
                        m.insert("chinese".into(), t.clone().into());
                    }
                    vec![serde_json::Value::Object(m)]
                }
            };
            map.insert("categories".into(), items.into());
        }
        if !self.actors.is_empty() {
            map.insert("actors".into(), self.actor_roster().into());
        }
        if !self.actresses.is_empty() {
            map.insert("actresses".into(), self.actress_roster().into());
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilingual_text_preferred() {
        let t = BilingualText::new("監督");
        assert_eq!(t.preferred(), "監督");
        let t = t.with_translation("导演");
        assert_eq!(t.preferred(), "导演");
    }

    #[test]
    fn test_category_set_display_items() {
        let item_wise = CategorySet::ItemWise(vec![
            BilingualText::new("単体作品").with_translation("单体作品"),
            BilingualText::new("ドラマ"),
        ]);
        assert_eq!(item_wise.display_items(), vec!["单体作品", "ドラマ"]);

        let list_wise = CategorySet::ListWise(BilingualList {
            original: vec!["単体作品".into(), "ドラマ".into()],
            translated: Some(vec!["单体作品".into()]),
        });
        // Translated list wins even when shorter; it is what the viewer reads.
        assert_eq!(list_wise.display_items(), vec!["单体作品"]);
    }

    #[test]
    fn test_list_wise_falls_back_to_original() {
        let list_wise = CategorySet::ListWise(BilingualList::new(vec!["企画".into()]));
        assert_eq!(list_wise.display_items(), vec!["企画"]);
        assert!(!matches!(&list_wise, CategorySet::ListWise(l) if l.fully_translated()));
    }

    #[test]
    fn test_metadata_has_content() {
        let mut metadata = Metadata::default();
        assert!(!metadata.has_content());
        metadata.title = Some(BilingualText::new("タイトル"));
        assert!(metadata.has_content());
    }

    #[test]
    fn test_prompt_value_skips_absent_fields() {
        let mut metadata = Metadata::default();
        metadata.title = Some(BilingualText::new("タイトル").with_translation("标题"));
        metadata.actresses = vec![Actor::from_name(BilingualText::new("女優A"))];

        let value = metadata.to_prompt_value();
        let map = value.as_object().unwrap();
        assert!(map.contains_key("title"));
        assert!(map.contains_key("actresses"));
        assert!(!map.contains_key("director"));
        assert_eq!(map["title"]["japanese"], "タイトル");
        assert_eq!(map["title"]["chinese"], "标题");
    }
}
