// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bilingual ASS Renderer
//!
//! Composes the terminal subtitle asset from the corrected source-language
//! SRT and the translated SRT. The source file is the blueprint: every
//! source cue yields exactly one ASS dialogue line, with the Chinese text
//! stacked above the source line when a translated cue matches within
//! ±500 ms on both boundaries, and the source alone otherwise. An entirely
//! missing translation therefore still renders a complete, watchable
//! asset.
//!
//! Ahead of the dialogue an intro sequence presents the metadata that
//! exists, one second per card, in fixed order: title, performer roster,
//! categories, studio, director with release date. Absent fields are
//! skipped without leaving gaps.

use tracing::warn;

use aurora_domain::entities::Metadata;
use aurora_domain::error::AuroraError;
use aurora_domain::subtitle::{self, SrtCue};

/// Matching tolerance against the translated track, per boundary.
const MATCH_TOLERANCE_MS: u64 = 500;

/// Seconds each intro card stays on screen.
const INTRO_CARD_SECS: f64 = 1.0;

/// Fixed script header; 1080p canvas, five styles.
const ASS_HEADER: &str = r#"[Script Info]
Title: {title}
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes
YCbCr Matrix: None
PlayResX: 1920
PlayResY: 1080

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: CHS_Main,Microsoft YaHei,75,&H00FFFFFF,&H000000FF,&H00000000,&H0050000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,20,1
Style: JPN_Sub,Microsoft YaHei,55,&H00B0B0B0,&H000000FF,&H00000000,&H0050000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,20,1
Style: Intro_Normal,Microsoft YaHei,65,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,1,0,0,0,100,100,0,0,1,2,2,5,10,10,10,1
Style: Intro_Small,Microsoft YaHei,50,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,1,0,0,0,100,100,0,0,1,2,2,5,10,10,10,1
Style: Intro_Large,Microsoft YaHei,80,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,1,0,0,0,100,100,0,0,1,2,2,5,10,10,10,1
[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
"#;

/// Milliseconds → ASS timestamp `H:MM:SS.cc`.
fn format_time_ass(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let centis = (ms % 1_000) / 10;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, centis)
}

fn format_seconds_ass(seconds: f64) -> String {
    format_time_ass((seconds.max(0.0) * 1000.0) as u64)
}

/// Finds the translated cue matching a source cue within tolerance.
fn find_matching_cue<'a>(source: &SrtCue, translated: &'a [SrtCue]) -> Option<&'a SrtCue> {
    translated.iter().find(|t| {
        source.start_ms.abs_diff(t.start_ms) <= MATCH_TOLERANCE_MS
            && source.end_ms.abs_diff(t.end_ms) <= MATCH_TOLERANCE_MS
    })
}

fn intro_card(start: f64, style: &str, text: &str) -> String {
    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}",
        format_seconds_ass(start),
        format_seconds_ass(start + INTRO_CARD_SECS),
        style,
        text
    )
}

/// Intro cards for whatever metadata exists, in presentation order.
fn intro_events(metadata: &Metadata) -> Vec<String> {
    let mut events = Vec::new();
    let mut clock = 0.0f64;

    if let Some(title) = &metadata.title {
        let text = title.preferred();
        if !text.is_empty() {
            events.push(intro_card(clock, "Intro_Large", text));
            clock += INTRO_CARD_SECS;
        }
    }

    let mut roster = String::new();
    let actress_names: Vec<&str> = metadata
        .actresses
        .iter()
        .flat_map(|a| a.names.iter().map(|n| n.preferred()))
        .collect();
    if !actress_names.is_empty() {
        roster.push_str(&format!("女演员：{}", actress_names.join(", ")));
    }
    let actor_names: Vec<&str> = metadata
        .actors
        .iter()
        .flat_map(|a| a.names.iter().map(|n| n.preferred()))
        .collect();
    if !actor_names.is_empty() {
        if !roster.is_empty() {
            roster.push('，');
        }
        roster.push_str(&format!("男演员：{}", actor_names.join(", ")));
    }
    if !roster.is_empty() {
        events.push(intro_card(clock, "Intro_Normal", &roster));
        clock += INTRO_CARD_SECS;
    }

    if let Some(categories) = &metadata.categories {
        let items = categories.display_items();
        if !items.is_empty() {
            events.push(intro_card(
                clock,
                "Intro_Normal",
                &format!("类别：{}", items.join(", ")),
            ));
            clock += INTRO_CARD_SECS;
        }
    }

    if let Some(studio) = &metadata.studio {
        let text = studio.preferred();
        if !text.is_empty() {
            events.push(intro_card(clock, "Intro_Normal", &format!("制作商：{}", text)));
            clock += INTRO_CARD_SECS;
        }
    }

    let mut closing = String::new();
    if let Some(director) = &metadata.director {
        let name = director.preferred();
        if !name.is_empty() {
            closing = format!("{}作品", name);
        }
    }
    if let Some(date) = &metadata.release_date {
        if !date.is_empty() {
            if !closing.is_empty() {
                closing.push_str(r"\N");
            }
            closing.push_str(&format!("发行日期：{}", date));
        }
    }
    if !closing.is_empty() {
        events.push(intro_card(clock, "Intro_Large", &closing));
    }

    events
}

/// Renders the full bilingual ASS document.
///
/// `translated_srt` may be absent or unparseable; dialogue then carries
/// source lines only.
///
/// # Errors
///
/// Fails only when the source SRT itself does not parse.
pub fn render_bilingual_ass(
    source_srt: &str,
    translated_srt: Option<&str>,
    title: &str,
    metadata: Option<&Metadata>,
) -> Result<String, AuroraError> {
    let source_cues = subtitle::parse_srt(source_srt)?;

    let translated_cues = match translated_srt {
        Some(content) => match subtitle::parse_srt(content) {
            Ok(cues) => cues,
            Err(err) => {
                warn!("Translated SRT unusable; rendering source only: {}", err);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let mut events: Vec<String> = Vec::new();

    if let Some(metadata) = metadata {
        events.push("; --- Intro ---".to_string());
        events.extend(intro_events(metadata));
    }

    events.push("; --- Dialogue ---".to_string());
    for cue in &source_cues {
        let source_text = cue.text.replace('\n', r"\N");
        let translated_text = find_matching_cue(cue, &translated_cues)
            .map(|t| t.text.replace('\n', r"\N"))
            .unwrap_or_default();

        let body = if translated_text.is_empty() {
            format!(r"{{\rJPN_Sub}}{}", source_text)
        } else {
            format!(r"{{\rCHS_Main}}{}{{\rJPN_Sub}}\N{}", translated_text, source_text)
        };

        events.push(format!(
            "Dialogue: 0,{},{},CHS_Main,,0,0,0,,{}",
            format_time_ass(cue.start_ms),
            format_time_ass(cue.end_ms),
            body
        ));
    }

    Ok(ASS_HEADER.replace("{title}", title) + &events.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_domain::entities::{Actor, BilingualText, CategorySet, Metadata};

    fn srt(entries: &[(u64, u64, &str)]) -> String {
        entries
            .iter()
            .enumerate()
            .map(|(i, (start, end, text))| {
                format!(
                    "{}\n{} --> {}\n{}",
                    i + 1,
                    subtitle::format_timestamp(*start),
                    subtitle::format_timestamp(*end),
                    text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn sample_metadata() -> Metadata {
        let mut metadata = Metadata::default();
        metadata.title = Some(BilingualText::new("タイトル").with_translation("标题"));
        metadata.actresses = vec![Actor::from_name(
            BilingualText::new("星宮一花").with_translation("星宫一花"),
        )];
        metadata.categories = Some(CategorySet::ItemWise(vec![
            BilingualText::new("ドラマ").with_translation("剧情"),
        ]));
        metadata.studio = Some(BilingualText::new("S1"));
        metadata.director = Some(BilingualText::new("監督X").with_translation("导演X"));
        metadata.release_date = Some("2024-03-01".into());
        metadata
    }

    #[test]
    fn test_time_format() {
        assert_eq!(format_time_ass(0), "0:00:00.00");
        assert_eq!(format_time_ass(61_230), "0:01:01.23");
        assert_eq!(format_time_ass(3_600_000), "1:00:00.00");
    }

    #[test]
    fn test_matched_cues_render_both_languages() {
        let source = srt(&[(1_000, 3_000, "こんにちは")]);
        let translated = srt(&[(1_200, 3_300, "你好")]);

        let ass = render_bilingual_ass(&source, Some(&translated), "T", None).unwrap();
        assert!(ass.contains(r"{\rCHS_Main}你好{\rJPN_Sub}\Nこんにちは"));
    }

    #[test]
    fn test_out_of_tolerance_cue_renders_source_only() {
        let source = srt(&[(1_000, 3_000, "こんにちは")]);
        let translated = srt(&[(1_800, 3_000, "你好")]);

        let ass = render_bilingual_ass(&source, Some(&translated), "T", None).unwrap();
        assert!(!ass.contains("你好"));
        assert!(ass.contains(r"{\rJPN_Sub}こんにちは"));
    }

    #[test]
    fn test_missing_translation_renders_every_source_cue() {
        let source = srt(&[(1_000, 3_000, "一"), (4_000, 6_000, "二")]);
        let ass = render_bilingual_ass(&source, None, "T", None).unwrap();
        assert_eq!(ass.matches("Dialogue: 0,").count(), 2);
        assert!(ass.matches(r"{\rCHS_Main}").count() == 0);
    }

    #[test]
    fn test_empty_source_yields_intro_only() {
        let ass = render_bilingual_ass("", None, "T", Some(&sample_metadata())).unwrap();
        // Five intro cards, no dialogue cues.
        assert!(ass.contains("标题"));
        assert!(ass.contains("星宫一花"));
        assert!(ass.contains("类别：剧情"));
        assert!(ass.contains("制作商：S1"));
        assert!(ass.contains(r"导演X作品\N发行日期：2024-03-01"));
        assert!(!ass.contains("CHS_Main,,0,0,0,,{"));
    }

    #[test]
    fn test_intro_cards_are_sequential_and_skip_absent() {
        let mut metadata = sample_metadata();
        metadata.actresses.clear();
        metadata.categories = None;

        let ass = render_bilingual_ass("", None, "T", Some(&metadata)).unwrap();
        // title at 0s, studio card directly after it at 1s.
        assert!(ass.contains("Dialogue: 0,0:00:00.00,0:00:01.00,Intro_Large,,0,0,0,,标题"));
        assert!(ass.contains("Dialogue: 0,0:00:01.00,0:00:02.00,Intro_Normal,,0,0,0,,制作商：S1"));
    }

    #[test]
    fn test_header_carries_title_and_styles() {
        let ass = render_bilingual_ass("", None, "ABC-123 - 标题", None).unwrap();
        assert!(ass.starts_with("[Script Info]\nTitle: ABC-123 - 标题"));
        assert!(ass.contains("PlayResX: 1920"));
        assert!(ass.contains("Style: CHS_Main,Microsoft YaHei,75"));
        assert!(ass.contains("Style: JPN_Sub,Microsoft YaHei,55"));
        assert!(ass.contains("Style: Intro_Large,Microsoft YaHei,80"));
    }
}
