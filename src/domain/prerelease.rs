//! Prerelease qualifier handling for channel versions
//!
//! A channel prerelease is always `<qualifier>.<sequence>`, e.g. `dev.3`.
//! See https://semver.org/#spec-item-9 for the identifier rules.

use crate::error::{ReleaseError, Result};
use std::fmt;

/// Validate a prerelease qualifier (the channel name embedded in a version).
///
/// Qualifiers must be non-empty, ASCII alphanumeric or hyphen, and must not be
/// purely numeric so they never collide with the sequence number.
pub fn validate_qualifier(qualifier: &str) -> Result<()> {
    if qualifier.is_empty() {
        return Err(ReleaseError::version("Empty prerelease qualifier"));
    }
    if !qualifier
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ReleaseError::version(format!(
            "Invalid prerelease qualifier: '{}'",
            qualifier
        )));
    }
    if qualifier.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReleaseError::version(format!(
            "Prerelease qualifier must not be numeric: '{}'",
            qualifier
        )));
    }
    Ok(())
}

/// Prerelease part of a channel version
///
/// # Examples
/// - "dev.1" -> PreRelease { qualifier: "dev", sequence: 1 }
/// - "beta.12" -> PreRelease { qualifier: "beta", sequence: 12 }
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreRelease {
    pub qualifier: String,
    /// Starts at 1 for each core version
    pub sequence: u64,
}

impl PreRelease {
    pub fn new(qualifier: impl Into<String>, sequence: u64) -> Self {
        PreRelease {
            qualifier: qualifier.into(),
            sequence,
        }
    }

    /// Parse a prerelease string of the form `<qualifier>.<sequence>`
    pub fn parse(s: &str) -> Result<Self> {
        let (qualifier, sequence) = s.split_once('.').ok_or_else(|| {
            ReleaseError::version(format!("Prerelease '{}' has no sequence number", s))
        })?;

        validate_qualifier(qualifier)?;

        let sequence = sequence.parse::<u64>().map_err(|_| {
            ReleaseError::version(format!("Invalid prerelease sequence: '{}'", sequence))
        })?;

        Ok(PreRelease::new(qualifier, sequence))
    }

    pub fn next(&self) -> Self {
        PreRelease::new(self.qualifier.clone(), self.sequence + 1)
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.sequence)
    }
}
