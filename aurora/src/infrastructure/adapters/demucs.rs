// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Demucs Denoising Adapter
//!
//! Vocal separation via the demucs CLI in two-stems mode. Demucs writes
//! `<work>/<model>/<input stem>/vocals.wav` into its own directory layout,
//! so the adapter runs it against a scratch directory next to the target,
//! then moves the vocals file onto the contract path and removes the
//! scratch tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use aurora_domain::error::AuroraError;
use aurora_domain::services::Denoiser;

use super::ffmpeg::run_with_timeout;

const DENOISE_TIMEOUT: Duration = Duration::from_secs(2 * 3600);

/// demucs-backed vocal separator.
pub struct DemucsDenoiser {
    demucs: String,
}

impl DemucsDenoiser {
    pub fn new(demucs: impl Into<String>) -> Self {
        Self {
            demucs: demucs.into(),
        }
    }

    /// Finds `vocals.wav` anywhere under the scratch directory.
    fn find_vocals(dir: &Path) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Some(found) = Self::find_vocals(&path) {
                    return Some(found);
                }
            } else if path.file_name().and_then(|n| n.to_str()) == Some("vocals.wav") {
                return Some(path);
            }
        }
        None
    }
}

#[async_trait]
impl Denoiser for DemucsDenoiser {
    async fn denoise(&self, input: &Path, output: &Path) -> Result<(), AuroraError> {
        let parent = output
            .parent()
            .ok_or_else(|| {
                AuroraError::ProcessingFailed(format!(
                    "Output path has no parent: {}",
                    output.display()
                ))
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let scratch = parent.join(".demucs_work");
        tokio::fs::create_dir_all(&scratch).await?;

        info!("Denoising {} with demucs", input.display());
        let mut command = Command::new(&self.demucs);
        command
            .arg("--two-stems")
            .arg("vocals")
            .arg("-o")
            .arg(&scratch)
            .arg(input);

        let result = run_with_timeout(command, DENOISE_TIMEOUT, "demucs").await;
        let outcome = match result {
            Ok(output_data) if output_data.status.success() => {
                match Self::find_vocals(&scratch) {
                    Some(vocals) => {
                        tokio::fs::copy(&vocals, output).await?;
                        Ok(())
                    }
                    None => Err(AuroraError::ProcessingFailed(format!(
                        "demucs produced no vocals.wav under {}",
                        scratch.display()
                    ))),
                }
            }
            Ok(output_data) => Err(AuroraError::ProcessingFailed(format!(
                "demucs returned {}: {}",
                output_data.status,
                String::from_utf8_lossy(&output_data.stderr)
            ))),
            Err(err) => Err(err),
        };

        // The scratch tree is large; drop it regardless of outcome.
        let _ = tokio::fs::remove_dir_all(&scratch).await;

        if outcome.is_ok() {
            info!("Denoised audio written to {}", output.display());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_vocals_recurses() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("htdemucs").join("movie");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("vocals.wav"), b"wav").unwrap();
        std::fs::write(nested.join("no_vocals.wav"), b"wav").unwrap();

        let found = DemucsDenoiser::find_vocals(dir.path()).unwrap();
        assert!(found.ends_with("vocals.wav"));
        assert!(!found.ends_with("no_vocals.wav"));
    }
}
