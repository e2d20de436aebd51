// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Library Scanner
//!
//! Converts a root directory into upserted movies. For every file with an
//! accepted video suffix the scanner computes the center-sample
//! fingerprint and reconciles against the manifest:
//!
//! - **known fingerprint, new path** — the file was moved or renamed;
//!   only location facts change, nothing is recomputed and stage rows are
//!   untouched;
//! - **known fingerprint, same path** — no-op;
//! - **new fingerprint** — the code extractor runs on the filename; a
//!   recognized code attaches the video to its standard movie, otherwise
//!   an anonymous movie keyed by the fingerprint is created.
//!
//! Per-file hash and IO failures log and skip; a scan never aborts
//! mid-walk. The return value is the set of movies whose videos were
//! touched, which is exactly the pipeline's work list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use aurora_domain::entities::{Movie, Video};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::Manifest;
use aurora_domain::value_objects::Fingerprint;

use crate::infrastructure::services::CodeExtractor;

/// Directory walker + manifest reconciler.
pub struct LibraryScanner {
    manifest: Arc<dyn Manifest>,
    extractor: Arc<CodeExtractor>,
}

impl LibraryScanner {
    pub fn new(manifest: Arc<dyn Manifest>, extractor: Arc<CodeExtractor>) -> Self {
        Self { manifest, extractor }
    }

    /// Recursively collects files with accepted video suffixes.
    fn walk_video_files(root: &Path, found: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Cannot read directory {}: {}", root.display(), err);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::walk_video_files(&path, found);
            } else if Video::validated_suffix(&path).is_ok() {
                found.push(path);
            }
        }
    }

    /// Scans a directory tree, returning the movies whose videos were
    /// touched.
    pub async fn scan(&self, root: &Path) -> Result<Vec<Movie>, AuroraError> {
        if !root.is_dir() {
            return Err(AuroraError::IoError(format!(
                "Scan root is not a directory: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        Self::walk_video_files(root, &mut files);
        info!("Found {} video files under {}", files.len(), root.display());

        let mut movies: HashMap<String, Movie> = HashMap::new();
        for path in files {
            match self.sync_file(&path, &mut movies).await {
                Ok(()) => {}
                Err(err) => {
                    // One broken file must not sink the walk.
                    warn!("Skipping {}: {}", path.display(), err);
                }
            }
        }

        Ok(movies.into_values().collect())
    }

    async fn sync_file(
        &self,
        path: &Path,
        movies: &mut HashMap<String, Movie>,
    ) -> Result<(), AuroraError> {
        let fingerprint = Fingerprint::sample_file(path)?;

        if let Some(mut video) = self.manifest.find_video(&fingerprint).await? {
            if video.absolute_path != path {
                info!(
                    "Video moved: {} -> {}",
                    video.absolute_path.display(),
                    path.display()
                );
                video.update_location(path)?;
                self.manifest.update_video_location(&video, path).await?;
            } else {
                debug!("Video unchanged: {}", path.display());
            }

            if let Some(movie) = self.manifest.find_movie_of_video(&video).await? {
                movies
                    .entry(movie.code_string())
                    .or_insert(movie)
                    .videos
                    .push(video);
            }
            return Ok(());
        }

        info!("New video detected: {}", path.display());
        let mut video = Video::new(path, fingerprint.clone())?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let movie = match self.extractor.extract_av_code(file_name).await {
            Some(code) => {
                self.manifest
                    .get_or_create_standard_movie(code.label(), code.number())
                    .await?
            }
            None => {
                warn!(
                    "No AV code in '{}'; filing under an anonymous movie",
                    file_name
                );
                self.manifest
                    .get_or_create_anonymous_movie(&fingerprint)
                    .await?
            }
        };

        video.movie_id = Some(movie.id);
        self.manifest.save_video(&video).await?;

        movies
            .entry(movie.code_string())
            .or_insert(movie)
            .videos
            .push(video);
        Ok(())
    }
}
