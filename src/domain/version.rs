use crate::domain::prerelease::PreRelease;
use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;
use std::fmt;

/// Numeric `major.minor.patch` core of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Core {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Core {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Core {
            major,
            minor,
            patch,
        }
    }

    /// Bump according to bump type, resetting lower components
    pub fn bump(&self, bump_type: VersionBump) -> Self {
        match bump_type {
            VersionBump::Major => Core::new(self.major + 1, 0, 0),
            VersionBump::Minor => Core::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => Core::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version bump type decision, ordered by precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionBump {
    Patch,
    Minor,
    Major,
}

/// A release version: stable versions never carry a prerelease, channel
/// prereleases always do.
///
/// Ordering is channel-local. Two stable versions compare by core; two
/// prereleases with the same qualifier compare by core then sequence.
/// Stable and prerelease versions, or prereleases with different
/// qualifiers, are incomparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub core: Core,
    pub prerelease: Option<PreRelease>,
}

impl Version {
    pub fn stable(core: Core) -> Self {
        Version {
            core,
            prerelease: None,
        }
    }

    pub fn prerelease(core: Core, qualifier: impl Into<String>, sequence: u64) -> Self {
        Version {
            core,
            prerelease: Some(PreRelease::new(qualifier, sequence)),
        }
    }

    /// The `0.0.0` baseline used when no release exists yet
    pub fn initial() -> Self {
        Version::stable(Core::new(0, 0, 0))
    }

    pub fn major(&self) -> u64 {
        self.core.major
    }

    pub fn minor(&self) -> u64 {
        self.core.minor
    }

    pub fn patch(&self) -> u64 {
        self.core.patch
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.prerelease.as_ref().map(|p| p.qualifier.as_str())
    }

    pub fn sequence(&self) -> Option<u64> {
        self.prerelease.as_ref().map(|p| p.sequence)
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Parse a bare version string (e.g. "1.3.0-dev.2").
    ///
    /// Build metadata is rejected, and prereleases must be of the form
    /// `<qualifier>.<sequence>`.
    pub fn parse(s: &str) -> Result<Self> {
        let parsed = semver::Version::parse(s)
            .map_err(|e| ReleaseError::version(format!("Invalid version '{}': {}", s, e)))?;

        if !parsed.build.is_empty() {
            return Err(ReleaseError::version(format!(
                "Build metadata is not supported: '{}'",
                s
            )));
        }

        let core = Core::new(parsed.major, parsed.minor, parsed.patch);
        if parsed.pre.is_empty() {
            Ok(Version::stable(core))
        } else {
            Ok(Version {
                core,
                prerelease: Some(PreRelease::parse(parsed.pre.as_str())?),
            })
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Some(self.core.cmp(&other.core)),
            (Some(a), Some(b)) if a.qualifier == b.qualifier => Some(
                self.core
                    .cmp(&other.core)
                    .then(a.sequence.cmp(&b.sequence)),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}
