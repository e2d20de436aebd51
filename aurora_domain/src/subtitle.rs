// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SRT Cue Grammar
//!
//! One cue is `index\n HH:MM:SS,mmm --> HH:MM:SS,mmm\n text(\n text)*`,
//! cues separated by a blank line. This module owns every operation the
//! pipeline performs on that grammar:
//!
//! - [`parse_srt`] — strict parse into [`SrtCue`] values (timestamps in
//!   milliseconds), used by the quality gates and the bilingual renderer;
//! - [`renumber`] — rewrite only the first line of each block so indices
//!   run `1..N`, used when best-effort slices are concatenated;
//! - [`count_cue_blocks`] / [`split_blocks`] — blank-line block accounting;
//! - [`adaptive_slice`] — balanced pre-splitting for the slice strategy;
//! - [`split_three`] — the even three-way split applied to a failing slice.
//!
//! Parsing is strict on the timestamp line but tolerant of multi-line text
//! and variable index widths; `renumber` is intentionally looser (blocks
//! with fewer than two lines are dropped, everything else passes through
//! untouched) because it runs on LLM output.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AuroraError;

static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2}),(\d{3})\s*$")
        .expect("timestamp regex compiles")
});

/// One parsed SRT cue; times are milliseconds from stream start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtCue {
    pub index: u32,
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl SrtCue {
    /// Renders the cue back into block form (no trailing blank line).
    pub fn to_block(&self) -> String {
        format!(
            "{}\n{} --> {}\n{}",
            self.index,
            format_timestamp(self.start_ms),
            format_timestamp(self.end_ms),
            self.text
        )
    }
}

/// Parses `HH:MM:SS,mmm` into milliseconds.
pub fn parse_timestamp(s: &str) -> Result<u64, AuroraError> {
    let s = s.trim();
    let (time_part, millis_part) = s.split_once(',').ok_or_else(|| {
        AuroraError::SubtitleError(format!("Invalid timestamp (missing millis): '{}'", s))
    })?;
    let mut parts = time_part.split(':');
    let (h, m, sec) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => {
            return Err(AuroraError::SubtitleError(format!(
                "Invalid timestamp: '{}'",
                s
            )))
        }
    };
    let parse = |v: &str, what: &str| -> Result<u64, AuroraError> {
        v.trim().parse::<u64>().map_err(|_| {
            AuroraError::SubtitleError(format!("Invalid {} in timestamp '{}'", what, s))
        })
    };
    Ok(parse(h, "hours")? * 3_600_000
        + parse(m, "minutes")? * 60_000
        + parse(sec, "seconds")? * 1_000
        + parse(millis_part, "milliseconds")?)
}

/// Formats milliseconds as `HH:MM:SS,mmm`.
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Splits content into non-empty cue blocks on blank lines.
pub fn split_blocks(srt: &str) -> Vec<&str> {
    srt.trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect()
}

/// Number of cue blocks in the content.
pub fn count_cue_blocks(srt: &str) -> usize {
    split_blocks(srt).len()
}

/// Strict parse of the whole document.
///
/// # Errors
///
/// Returns `SubtitleError` for any block whose second line is not a valid
/// timestamp line or whose first line is not an integer index.
pub fn parse_srt(srt: &str) -> Result<Vec<SrtCue>, AuroraError> {
    let mut cues = Vec::new();
    for block in split_blocks(srt) {
        let mut lines = block.lines();
        let index_line = lines.next().unwrap_or_default().trim();
        let index: u32 = index_line.parse().map_err(|_| {
            AuroraError::SubtitleError(format!("Invalid cue index: '{}'", index_line))
        })?;
        let time_line = lines.next().ok_or_else(|| {
            AuroraError::SubtitleError(format!("Cue {} is missing its timestamp line", index))
        })?;
        let caps = TIMESTAMP_LINE.captures(time_line.trim()).ok_or_else(|| {
            AuroraError::SubtitleError(format!("Invalid timestamp line: '{}'", time_line.trim()))
        })?;
        let ms = |i: usize| caps[i].parse::<u64>().expect("digits matched by regex");
        let start_ms = ms(1) * 3_600_000 + ms(2) * 60_000 + ms(3) * 1_000 + ms(4);
        let end_ms = ms(5) * 3_600_000 + ms(6) * 60_000 + ms(7) * 1_000 + ms(8);
        let text = lines.collect::<Vec<_>>().join("\n");
        cues.push(SrtCue {
            index,
            start_ms,
            end_ms,
            text,
        });
    }
    Ok(cues)
}

/// Renders cues back into a full SRT document.
pub fn render_srt(cues: &[SrtCue]) -> String {
    let blocks: Vec<String> = cues.iter().map(|c| c.to_block()).collect();
    blocks.join("\n\n")
}

/// Rewrites cue indices to run `1..N`, touching only each block's first line.
///
/// Blocks with fewer than two lines are dropped; everything below the first
/// line (timestamps, text) passes through byte-for-byte.
pub fn renumber(srt: &str) -> String {
    let mut renumbered = Vec::new();
    let mut next_index = 1usize;
    for block in split_blocks(srt) {
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.len() < 2 {
            continue;
        }
        let mut out = vec![next_index.to_string()];
        out.extend(lines[1..].iter().map(|l| l.to_string()));
        renumbered.push(out.join("\n"));
        next_index += 1;
    }
    renumbered.join("\n\n")
}

/// Balanced pre-split for the slice strategy.
///
/// With `total` cue blocks and a target of `slice_size` per slice the plan
/// is `num_slices = ceil(total / slice_size)`, distributed as
/// `base = total / num_slices` with the first `total % num_slices` slices
/// taking one extra block. Slice sizes therefore differ by at most one and
/// no tiny tail slice is produced.
pub fn adaptive_slice(srt: &str, slice_size: usize) -> Vec<String> {
    if srt.trim().is_empty() || slice_size == 0 {
        return Vec::new();
    }
    let blocks = split_blocks(srt);
    let total = blocks.len();
    if total == 0 {
        return Vec::new();
    }
    if total <= slice_size {
        return vec![srt.to_string()];
    }

    let num_slices = total.div_ceil(slice_size);
    let base = total / num_slices;
    let remainder = total % num_slices;

    let mut slices = Vec::with_capacity(num_slices);
    let mut cursor = 0usize;
    for i in 0..num_slices {
        let len = if i < remainder { base + 1 } else { base };
        slices.push(blocks[cursor..cursor + len].join("\n\n"));
        cursor += len;
    }
    slices
}

/// Splits content into three near-even parts by cue blocks.
///
/// Used on a failing slice: the first two parts take `total / 3` blocks
/// each and the last takes the rest. Each part keeps the `\n\n` block
/// separator convention with a trailing blank line.
pub fn split_three(srt: &str) -> (String, String, String) {
    let blocks = split_blocks(srt);
    let total = blocks.len();
    let third = total / 3;

    let join = |slice: &[&str]| -> String {
        let mut s = slice.join("\n\n");
        s.push_str("\n\n");
        s
    };

    (
        join(&blocks[..third]),
        join(&blocks[third..2 * third]),
        join(&blocks[2 * third..]),
    )
}
