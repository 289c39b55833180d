//! The per-run release record shared read-only by every pipeline step.

use crate::domain::{Channel, Version};
use crate::template::Variable;

/// Commits covered by a release: everything after `from` up to `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    /// Last release tag the range starts after, `None` for the first release
    pub from_tag: Option<String>,
    /// Branch head commit hash
    pub to: String,
    pub commit_count: usize,
}

/// Created once after the version is computed and never mutated afterwards.
/// Steps only ever see `&ReleaseContext`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseContext {
    version: Version,
    channel: Channel,
    branch: String,
    tag: String,
    notes: String,
    commit_range: CommitRange,
    dry_run: bool,
}

impl ReleaseContext {
    pub fn new(
        version: Version,
        channel: Channel,
        branch: impl Into<String>,
        tag: impl Into<String>,
        notes: impl Into<String>,
        commit_range: CommitRange,
        dry_run: bool,
    ) -> Self {
        ReleaseContext {
            version,
            channel,
            branch: branch.into(),
            tag: tag.into(),
            notes: notes.into(),
            commit_range,
            dry_run,
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// VCS tag name carrying this release
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn commit_range(&self) -> &CommitRange {
        &self.commit_range
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Value of a template variable; empty means "false" in conditionals
    pub fn value(&self, variable: Variable) -> String {
        match variable {
            Variable::Version => self.version.to_string(),
            Variable::Channel => self.channel.name().unwrap_or_default().to_string(),
            Variable::Major => self.version.major().to_string(),
            Variable::Minor => self.version.minor().to_string(),
            Variable::Patch => self.version.patch().to_string(),
            Variable::Tag => self.tag.clone(),
            Variable::Notes => self.notes.clone(),
            Variable::Branch => self.branch.clone(),
        }
    }

    /// Environment exported to external commands
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("RELEASE_VERSION".to_string(), self.version.to_string()),
            ("RELEASE_TAG".to_string(), self.tag.clone()),
            ("RELEASE_BRANCH".to_string(), self.branch.clone()),
            ("RELEASE_CHANNEL".to_string(), self.channel.key().to_string()),
            (
                "RELEASE_PRERELEASE".to_string(),
                self.channel.is_prerelease().to_string(),
            ),
            ("RELEASE_DRY_RUN".to_string(), self.dry_run.to_string()),
        ]
    }
}
