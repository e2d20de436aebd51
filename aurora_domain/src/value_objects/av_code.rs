// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AV Code Value Object
//!
//! An [`AvCode`] is the canonical identity of a movie: an uppercase ASCII
//! label plus a number, rendered as `LABEL-number` (e.g. `ABC-123`).
//!
//! Two variants exist and are distinguished by the label:
//!
//! - **Standard** — the label is 2–8 uppercase letters and the number is all
//!   digits. Produced by the code extractor from a filename.
//! - **Anonymous** — the label is the reserved `UNKNOWN` and the number is
//!   the 64-hex content fingerprint of one of the movie's videos. Used when
//!   no code could be extracted.
//!
//! The invariant `label == "UNKNOWN" ⇔ number is 64-hex` is enforced at
//! construction; an `AvCode` that exists is valid.
//!
//! # Examples
//!
//! ```
//! use aurora_domain::value_objects::AvCode;
//!
//! let code = AvCode::standard("abc", "123").unwrap();
//! assert_eq!(code.to_string(), "ABC-123");
//! assert!(!code.is_anonymous());
//!
//! let anon = AvCode::anonymous(&"a1".repeat(32)).unwrap();
//! assert_eq!(anon.label(), "UNKNOWN");
//! assert!(anon.is_anonymous());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::AuroraError;
use crate::value_objects::fingerprint::is_hex_digest;

/// Reserved label for movies whose code could not be extracted.
pub const ANONYMOUS_LABEL: &str = "UNKNOWN";

/// Canonical movie identity `(label, number)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvCode {
    label: String,
    number: String,
}

impl AvCode {
    /// Creates a standard code from a label and an all-digit number.
    ///
    /// The label is uppercased; both parts are validated.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode` if the label is not 2–8 ASCII letters or the
    /// number is not 2–7 digits.
    pub fn standard(label: &str, number: &str) -> Result<Self, AuroraError> {
        let label = label.to_ascii_uppercase();
        if label.len() < 2 || label.len() > 8 || !label.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(AuroraError::InvalidCode(format!(
                "label must be 2-8 ASCII letters, got '{}'",
                label
            )));
        }
        if number.len() < 2 || number.len() > 7 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuroraError::InvalidCode(format!(
                "number must be 2-7 digits, got '{}'",
                number
            )));
        }
        Ok(Self {
            label,
            number: number.to_string(),
        })
    }

    /// Creates an anonymous code from a video fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode` if the digest is not 64 hex characters.
    pub fn anonymous(sha256: &str) -> Result<Self, AuroraError> {
        if !is_hex_digest(sha256) {
            return Err(AuroraError::InvalidCode(format!(
                "anonymous number must be a 64-hex SHA-256, got '{}'",
                sha256
            )));
        }
        Ok(Self {
            label: ANONYMOUS_LABEL.to_string(),
            number: sha256.to_ascii_lowercase(),
        })
    }

    /// Reconstructs a code from persisted parts, re-checking the invariant.
    pub fn from_parts(label: &str, number: &str) -> Result<Self, AuroraError> {
        if label == ANONYMOUS_LABEL {
            Self::anonymous(number)
        } else {
            Self::standard(label, number)
        }
    }

    /// The uppercase label part (`UNKNOWN` for anonymous movies).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The number part: digits, or a 64-hex digest for anonymous movies.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Whether this is an anonymous identity.
    pub fn is_anonymous(&self) -> bool {
        self.label == ANONYMOUS_LABEL
    }
}

impl std::fmt::Display for AvCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.label, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_code_uppercases_label() {
        let code = AvCode::standard("vrkm", "1477").unwrap();
        assert_eq!(code.label(), "VRKM");
        assert_eq!(code.number(), "1477");
        assert_eq!(code.to_string(), "VRKM-1477");
    }

    #[test]
    fn test_standard_code_rejects_bad_parts() {
        assert!(AvCode::standard("a", "123").is_err());
        assert!(AvCode::standard("ABCDEFGHI", "123").is_err());
        assert!(AvCode::standard("ABC", "1").is_err());
        assert!(AvCode::standard("ABC", "12345678").is_err());
        assert!(AvCode::standard("AB1", "123").is_err());
        assert!(AvCode::standard("ABC", "12a").is_err());
    }

    #[test]
    fn test_anonymous_code() {
        let digest = "f".repeat(64);
        let code = AvCode::anonymous(&digest).unwrap();
        assert!(code.is_anonymous());
        assert_eq!(code.number(), digest);
        assert!(AvCode::anonymous("deadbeef").is_err());
    }

    #[test]
    fn test_from_parts_round_trip() {
        let code = AvCode::standard("SSIS", "001").unwrap();
        let again = AvCode::from_parts(code.label(), code.number()).unwrap();
        assert_eq!(code, again);

        let digest = "0a".repeat(32);
        let anon = AvCode::anonymous(&digest).unwrap();
        let again = AvCode::from_parts(anon.label(), anon.number()).unwrap();
        assert_eq!(anon, again);
    }

    #[test]
    fn test_unknown_label_requires_digest() {
        assert!(AvCode::from_parts(ANONYMOUS_LABEL, "123").is_err());
    }
}
