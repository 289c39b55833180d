use crate::domain::prerelease::validate_qualifier;
use crate::error::{ReleaseError, Result};
use std::collections::HashSet;
use std::fmt;

/// A release lane bound to one branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Stable,
    /// Prerelease lane; the name is the version qualifier
    Prerelease(String),
}

impl Channel {
    /// Qualifier for prerelease channels, `None` for stable
    pub fn name(&self) -> Option<&str> {
        match self {
            Channel::Stable => None,
            Channel::Prerelease(name) => Some(name),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(self, Channel::Prerelease(_))
    }

    /// Identifier usable in file names and log lines
    pub fn key(&self) -> &str {
        self.name().unwrap_or("stable")
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stable => write!(f, "stable"),
            Channel::Prerelease(name) => write!(f, "prerelease '{}'", name),
        }
    }
}

/// One configured branch to channel mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRule {
    pub branch: String,
    pub channel: Channel,
}

/// Outcome of channel resolution for a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Eligible(Channel),
    /// The branch is not configured for releases
    Ineligible,
}

/// Maps branch identity to a release channel.
///
/// Resolution is an exact-match lookup and never looks at commit content, so
/// eligibility is known before any history is read.
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    rules: Vec<BranchRule>,
}

impl ChannelResolver {
    /// Build a resolver from ordered rules.
    ///
    /// Requires exactly one stable branch, unique branch names and unique,
    /// valid prerelease qualifiers, so at most one channel resolves per branch.
    pub fn new(rules: Vec<BranchRule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(ReleaseError::config("No release branches configured"));
        }

        let mut branches = HashSet::new();
        let mut qualifiers = HashSet::new();
        let mut stable = 0;

        for rule in &rules {
            if rule.branch.trim().is_empty() {
                return Err(ReleaseError::config("Branch name must not be empty"));
            }
            if !branches.insert(rule.branch.as_str()) {
                return Err(ReleaseError::config(format!(
                    "Branch '{}' is configured more than once",
                    rule.branch
                )));
            }
            match &rule.channel {
                Channel::Stable => stable += 1,
                Channel::Prerelease(name) => {
                    validate_qualifier(name).map_err(|e| {
                        ReleaseError::config(format!("Branch '{}': {}", rule.branch, e))
                    })?;
                    if !qualifiers.insert(name.as_str()) {
                        return Err(ReleaseError::config(format!(
                            "Prerelease qualifier '{}' is used by more than one branch",
                            name
                        )));
                    }
                }
            }
        }

        if stable != 1 {
            return Err(ReleaseError::config(format!(
                "Exactly one stable branch is required, found {}",
                stable
            )));
        }

        Ok(ChannelResolver { rules })
    }

    pub fn resolve(&self, branch: &str) -> Resolution {
        self.rules
            .iter()
            .find(|rule| rule.branch == branch)
            .map(|rule| Resolution::Eligible(rule.channel.clone()))
            .unwrap_or(Resolution::Ineligible)
    }

    pub fn rules(&self) -> &[BranchRule] {
        &self.rules
    }
}
