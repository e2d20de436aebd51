// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Content Fingerprint Value Object
//!
//! A [`Fingerprint`] is the lowercase 64-hex SHA-256 that identifies a video
//! by content rather than by path. The digest is computed over a 1 MiB
//! window taken from the **center** of the file — `(file_size − 1 MiB) / 2`
//! — or over the whole file when it is smaller than the window. Sampling
//! the center rather than the head distinguishes files that share container
//! headers.
//!
//! The fingerprint is the stable identity across moves and renames; the
//! scanner reconciles `absolute_path` changes against it.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AuroraError;

/// Size of the sampling window, in bytes.
pub const SAMPLE_SIZE: u64 = 1024 * 1024;

/// Returns true when `s` is a 64-character hexadecimal string.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Lowercase 64-hex SHA-256 content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps a precomputed digest, normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFingerprint` unless the input is 64 hex characters.
    pub fn new(hex_digest: &str) -> Result<Self, AuroraError> {
        if !is_hex_digest(hex_digest) {
            return Err(AuroraError::InvalidFingerprint(format!(
                "expected 64 hex characters, got '{}'",
                hex_digest
            )));
        }
        Ok(Self(hex_digest.to_ascii_lowercase()))
    }

    /// Computes the center-sample fingerprint of a file.
    ///
    /// Reads 1 MiB starting at `(file_size − 1 MiB) / 2`, or the whole file
    /// when it is smaller than the window.
    ///
    /// # Errors
    ///
    /// Propagates IO failures as `IoError`; the scanner logs and skips the
    /// file rather than aborting the walk.
    pub fn sample_file(path: &Path) -> Result<Self, AuroraError> {
        let mut file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();

        let mut hasher = Sha256::new();
        if file_size <= SAMPLE_SIZE {
            let mut buf = Vec::with_capacity(file_size as usize);
            file.read_to_end(&mut buf)?;
            hasher.update(&buf);
        } else {
            let offset = (file_size - SAMPLE_SIZE) / 2;
            file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; SAMPLE_SIZE as usize];
            file.read_exact(&mut buf)?;
            hasher.update(&buf);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// The digest as a lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validates_hex_digest() {
        assert!(Fingerprint::new(&"a".repeat(64)).is_ok());
        assert!(Fingerprint::new(&"A".repeat(64)).is_ok());
        assert!(Fingerprint::new("abc").is_err());
        assert!(Fingerprint::new(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_normalizes_to_lowercase() {
        let fp = Fingerprint::new(&"AB".repeat(32)).unwrap();
        assert_eq!(fp.as_str(), "ab".repeat(32));
    }

    #[test]
    fn test_small_file_hashes_whole_content() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"tiny video stand-in").unwrap();

        let fp = Fingerprint::sample_file(tmp.path()).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"tiny video stand-in");
        assert_eq!(fp.as_str(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_large_file_samples_center() {
        // 3 MiB of positional bytes; the window must start at 1 MiB.
        let size = 3 * SAMPLE_SIZE as usize;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&data).unwrap();

        let fp = Fingerprint::sample_file(tmp.path()).unwrap();

        let offset = ((size as u64 - SAMPLE_SIZE) / 2) as usize;
        let mut hasher = Sha256::new();
        hasher.update(&data[offset..offset + SAMPLE_SIZE as usize]);
        assert_eq!(fp.as_str(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_identical_heads_different_centers() {
        let size = 3 * SAMPLE_SIZE as usize;
        let mut a = vec![0u8; size];
        let mut b = vec![0u8; size];
        a[size / 2] = 1;
        b[size / 2] = 2;

        let mut fa = tempfile::NamedTempFile::new().unwrap();
        fa.write_all(&a).unwrap();
        let mut fb = tempfile::NamedTempFile::new().unwrap();
        fb.write_all(&b).unwrap();

        assert_ne!(
            Fingerprint::sample_file(fa.path()).unwrap(),
            Fingerprint::sample_file(fb.path()).unwrap()
        );
    }
}
