// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Video Entity and Stage Status
//!
//! A [`Video`] is one file on disk, identified by its content
//! [`Fingerprint`](crate::value_objects::Fingerprint) rather than its path.
//! `absolute_path`, `filename`, and `suffix` are mutable location facts the
//! scanner reconciles on every run; the fingerprint never changes.
//!
//! Each video carries at most one [`EntityStageStatus`] row per stage of the
//! fixed order. Rows record the stage outcome and the by-product path the
//! stage wrote. The pipeline engine owns the lifecycle: rows start PENDING,
//! a stage mutates its own row while executing, and the reconciliation
//! kernel resets the tail of the order when an artifact goes missing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuroraError;
use crate::value_objects::{Fingerprint, VideoStage};

/// Accepted video filename suffixes, lowercase.
pub const VIDEO_SUFFIXES: [&str; 10] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "mpg", "mpeg", "3gp",
];

/// Outcome of one stage execution for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    /// Not yet executed (or reset for re-execution)
    Pending,
    /// Executed and produced its by-product
    Success,
    /// Critical failure; later stages of this video do not run
    Failed,
    /// Non-critical failure tolerated; later stages continue
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Success => "success",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

impl std::str::FromStr for StageStatus {
    type Err = AuroraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StageStatus::Pending),
            "success" => Ok(StageStatus::Success),
            "failed" => Ok(StageStatus::Failed),
            "skipped" => Ok(StageStatus::Skipped),
            _ => Err(AuroraError::ValidationError(format!(
                "Unknown stage status: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One `(entity, stage)` status row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStageStatus {
    pub id: Uuid,
    pub stage: VideoStage,
    pub status: StageStatus,
    pub by_product_path: Option<PathBuf>,
}

impl EntityStageStatus {
    /// Creates a fresh PENDING row for a stage.
    pub fn pending(stage: VideoStage) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage,
            status: StageStatus::Pending,
            by_product_path: None,
        }
    }
}

/// One video file, identified by content fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub movie_id: Option<Uuid>,
    pub fingerprint: Fingerprint,
    pub filename: String,
    pub suffix: String,
    pub absolute_path: PathBuf,
    /// Stage rows keyed by stage; a subset of the fixed order.
    pub stages: HashMap<VideoStage, EntityStageStatus>,
}

impl Video {
    /// Creates a video record for a file path and its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSuffix` when the extension is not in
    /// [`VIDEO_SUFFIXES`], and `ValidationError` when the path has no stem.
    pub fn new(path: &Path, fingerprint: Fingerprint) -> Result<Self, AuroraError> {
        let suffix = Self::validated_suffix(path)?;
        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                AuroraError::ValidationError(format!("Path has no filename: {}", path.display()))
            })?
            .to_string();

        Ok(Self {
            id: Uuid::new_v4(),
            movie_id: None,
            fingerprint,
            filename,
            suffix,
            absolute_path: path.to_path_buf(),
            stages: HashMap::new(),
        })
    }

    /// Extracts and validates the lowercase suffix of a path.
    pub fn validated_suffix(path: &Path) -> Result<String, AuroraError> {
        let suffix = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        if !VIDEO_SUFFIXES.contains(&suffix.as_str()) {
            return Err(AuroraError::UnsupportedSuffix(suffix));
        }
        Ok(suffix)
    }

    /// Moves the record to a new location without touching content identity.
    pub fn update_location(&mut self, path: &Path) -> Result<(), AuroraError> {
        self.suffix = Self::validated_suffix(path)?;
        self.filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                AuroraError::ValidationError(format!("Path has no filename: {}", path.display()))
            })?
            .to_string();
        self.absolute_path = path.to_path_buf();
        Ok(())
    }

    /// Status of a stage; PENDING when no row exists yet.
    pub fn stage_status(&self, stage: VideoStage) -> StageStatus {
        self.stages
            .get(&stage)
            .map(|s| s.status)
            .unwrap_or(StageStatus::Pending)
    }

    /// Recorded by-product path of a stage, if any.
    pub fn by_product(&self, stage: VideoStage) -> Option<&Path> {
        self.stages
            .get(&stage)
            .and_then(|s| s.by_product_path.as_deref())
    }

    /// Records a stage outcome, creating the row when absent.
    pub fn set_stage(
        &mut self,
        stage: VideoStage,
        status: StageStatus,
        by_product_path: Option<PathBuf>,
    ) {
        let entry = self
            .stages
            .entry(stage)
            .or_insert_with(|| EntityStageStatus::pending(stage));
        entry.status = status;
        if by_product_path.is_some() {
            entry.by_product_path = by_product_path;
        }
    }

    /// Resets a stage row to PENDING and forgets its by-product path.
    pub fn reset_stage(&mut self, stage: VideoStage) {
        let entry = self
            .stages
            .entry(stage)
            .or_insert_with(|| EntityStageStatus::pending(stage));
        entry.status = StageStatus::Pending;
        entry.by_product_path = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> Fingerprint {
        Fingerprint::new(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn test_new_video_validates_suffix() {
        let video = Video::new(Path::new("/data/ABC-123 sample.mp4"), fingerprint()).unwrap();
        assert_eq!(video.filename, "ABC-123 sample");
        assert_eq!(video.suffix, "mp4");

        let err = Video::new(Path::new("/data/readme.txt"), fingerprint());
        assert!(matches!(err, Err(AuroraError::UnsupportedSuffix(_))));
    }

    #[test]
    fn test_suffix_is_case_insensitive() {
        let video = Video::new(Path::new("/data/clip.MKV"), fingerprint()).unwrap();
        assert_eq!(video.suffix, "mkv");
    }

    #[test]
    fn test_update_location_keeps_identity() {
        let mut video = Video::new(Path::new("/a/ABC-123.mp4"), fingerprint()).unwrap();
        let id = video.id;
        let fp = video.fingerprint.clone();

        video.update_location(Path::new("/b/renamed.mkv")).unwrap();

        assert_eq!(video.id, id);
        assert_eq!(video.fingerprint, fp);
        assert_eq!(video.filename, "renamed");
        assert_eq!(video.suffix, "mkv");
        assert_eq!(video.absolute_path, PathBuf::from("/b/renamed.mkv"));
    }

    #[test]
    fn test_stage_defaults_to_pending() {
        let video = Video::new(Path::new("/a/x.mp4"), fingerprint()).unwrap();
        assert_eq!(video.stage_status(VideoStage::ExtractAudio), StageStatus::Pending);
        assert!(video.by_product(VideoStage::ExtractAudio).is_none());
    }

    #[test]
    fn test_set_and_reset_stage() {
        let mut video = Video::new(Path::new("/a/x.mp4"), fingerprint()).unwrap();
        video.set_stage(
            VideoStage::ExtractAudio,
            StageStatus::Success,
            Some(PathBuf::from("/out/x.extract.wav")),
        );
        assert_eq!(video.stage_status(VideoStage::ExtractAudio), StageStatus::Success);
        assert!(video.by_product(VideoStage::ExtractAudio).is_some());

        // A status-only update must not erase the recorded path.
        video.set_stage(VideoStage::ExtractAudio, StageStatus::Failed, None);
        assert!(video.by_product(VideoStage::ExtractAudio).is_some());

        video.reset_stage(VideoStage::ExtractAudio);
        assert_eq!(video.stage_status(VideoStage::ExtractAudio), StageStatus::Pending);
        assert!(video.by_product(VideoStage::ExtractAudio).is_none());
    }
}
